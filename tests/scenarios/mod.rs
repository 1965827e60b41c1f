//! Scenario tests for local stage execution and plan assembly

mod plan_wiring;
mod session_order;
mod stage_run;
mod teardown;
