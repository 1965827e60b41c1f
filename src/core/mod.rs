//! Core domain models for the pipeline composition model
//!
//! This module defines the data structures that describe task images,
//! task descriptors, pipeline plans and the environment they are
//! assembled against.

pub mod environment;
pub mod image;
pub mod plan;
pub mod queue;
pub mod task;

pub use environment::*;
pub use image::*;
pub use plan::*;
pub use task::*;
