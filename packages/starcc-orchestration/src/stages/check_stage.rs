use crate::counters::Counter;
use crate::error::Result;
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageOutput};
use crate::shuffle::Group;
use crate::substrate::{run_job, GroupedJob, MapContext, ReduceContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use starcc_storage::{ClusterRecord, EdgeRecord, NO_NEIGHBOR};
use std::sync::Arc;
use tracing::warn;

/// Partition Checker - counts nodes that appear in more than one cluster.
///
/// Never runs the combiner: deduplicating `(node, unit)` pairs would hide
/// exactly the repeats being counted.
pub struct CheckStage;

impl CheckStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CheckStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for CheckStage {
    fn stage_id(&self) -> StageId {
        StageId::Check
    }

    async fn execute(&self, input: StageInput, ctx: &StageContext) -> Result<StageOutput> {
        let report = run_job(
            ctx.store.as_ref(),
            Arc::new(CheckJob),
            &input.inputs,
            None,
            ctx.job_settings(),
        )
        .await?;

        let output = StageOutput::from_report(report);
        let verdict = CheckReport::from_output(&output);
        if !verdict.ok {
            warn!(
                "Partition violation: {} node(s) appear in more than one cluster",
                verdict.num_errors
            );
        }
        Ok(output)
    }
}

/// Checker verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub checked_nodes: u64,
    pub num_errors: u64,
    pub ok: bool,
}

impl CheckReport {
    pub fn from_output(output: &StageOutput) -> Self {
        let num_errors = output.counter(Counter::NumErrors);
        Self {
            checked_nodes: output.counter(Counter::NumCheckedNodes),
            num_errors,
            ok: num_errors == 0,
        }
    }
}

pub struct CheckJob;

impl GroupedJob for CheckJob {
    type Input = ClusterRecord;
    type Output = EdgeRecord;

    fn name(&self) -> &'static str {
        "check"
    }

    fn map(&self, cluster: &ClusterRecord, ctx: &mut MapContext) -> Result<()> {
        for &member in &cluster.members {
            ctx.emit(member, NO_NEIGHBOR);
        }
        Ok(())
    }

    fn reduce(&self, group: Group<'_>, ctx: &mut ReduceContext<EdgeRecord>) -> Result<()> {
        ctx.incr(Counter::NumCheckedNodes, 1);
        if group.len() > 1 {
            ctx.incr(Counter::NumErrors, 1);
        }
        Ok(())
    }
}
