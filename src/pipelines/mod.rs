//! Pipeline assemblers
//!
//! Each variant builds its resources first, then chains task builders in
//! pipeline order. Artifact names line up by convention (see
//! [`crate::tasks::artifacts`]); `PipelinePlan::check_artifact_wiring`
//! confirms it.

pub mod distribution;
pub mod pdf;

use crate::core::environment::PipelineEnvironment;
use crate::core::plan::{PipelinePlan, PlanError, Resource};
use crate::tasks::artifacts::CNX_RECIPES;
use std::fmt;
use std::str::FromStr;

const CNX_RECIPES_URI: &str = "https://github.com/openstax/cnx-recipes.git";

/// Plan variants sharing the task vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    /// Feed-driven: bake every new feed version and upload the JSON
    Distribution,
    /// Request-driven: bake a single requested book into a PDF
    Pdf,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 2] = [PipelineKind::Distribution, PipelineKind::Pdf];

    pub fn name(&self) -> &'static str {
        match self {
            PipelineKind::Distribution => "distribution",
            PipelineKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PipelineKind {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineKind::ALL
            .iter()
            .find(|kind| kind.name() == s)
            .copied()
            .ok_or_else(|| PlanError::UnknownPipeline(s.to_string()))
    }
}

/// Assemble a plan for `env`, refusing plans with broken artifact wiring
pub fn assemble(kind: PipelineKind, env: &PipelineEnvironment) -> Result<PipelinePlan, PlanError> {
    let plan = match kind {
        PipelineKind::Distribution => distribution::assemble(env)?,
        PipelineKind::Pdf => pdf::assemble(env)?,
    };
    plan.check_artifact_wiring()?;
    Ok(plan)
}

fn cnx_recipes() -> Resource {
    Resource::new(CNX_RECIPES, "git").with_source("uri", CNX_RECIPES_URI)
}
