use serde::Serialize;
use std::fmt;

/// The states a single realization passes through, in order.
///
/// `Done` either loops back to `BuildPlan` for the next realization index or ends the
/// run after the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    Init,
    BuildPlan,
    InvokePacker,
    PartitionResult,
    FilterFluidFluid,
    MergeWithSolid,
    FilterFluidSolid,
    Persist,
    Done,
}

impl PipelineStage {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Init => "init",
            PipelineStage::BuildPlan => "build-plan",
            PipelineStage::InvokePacker => "invoke-packer",
            PipelineStage::PartitionResult => "partition-result",
            PipelineStage::FilterFluidFluid => "filter-fluid-fluid",
            PipelineStage::MergeWithSolid => "merge-with-solid",
            PipelineStage::FilterFluidSolid => "filter-fluid-solid",
            PipelineStage::Persist => "persist",
            PipelineStage::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
