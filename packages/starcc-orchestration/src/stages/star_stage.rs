use crate::counters::Counter;
use crate::error::Result;
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageOutput};
use crate::shuffle::Group;
use crate::substrate::{run_job, GroupedJob, MapContext, ReduceContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use starcc_storage::EdgeRecord;
use std::sync::Arc;

/// Edge-rewrite mode of one contraction round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StarMode {
    /// Every node sees its whole neighborhood and relabels larger neighbors.
    Large,
    /// Every node sees its smaller neighbors and joins its minimum.
    Small,
}

impl StarMode {
    pub fn stage_id(&self) -> StageId {
        match self {
            StarMode::Large => StageId::LargeStar,
            StarMode::Small => StageId::SmallStar,
        }
    }
}

/// Star Contractor - one Large-Star or Small-Star pass over an edge set.
///
/// Reports `NUM_CHANGES`, the relabeling count the controller uses to
/// detect convergence.
pub struct StarStage {
    mode: StarMode,
}

impl StarStage {
    pub fn new(mode: StarMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> StarMode {
        self.mode
    }
}

#[async_trait]
impl StageHandler for StarStage {
    fn stage_id(&self) -> StageId {
        self.mode.stage_id()
    }

    async fn execute(&self, input: StageInput, ctx: &StageContext) -> Result<StageOutput> {
        let report = run_job(
            ctx.store.as_ref(),
            Arc::new(StarJob::new(self.mode)),
            &input.inputs,
            input.output.as_ref(),
            ctx.job_settings(),
        )
        .await?;
        Ok(StageOutput::from_report(report))
    }
}

/// The map and reduce functions of a contraction round.
#[derive(Debug, Clone, Copy)]
pub struct StarJob {
    mode: StarMode,
}

impl StarJob {
    pub fn new(mode: StarMode) -> Self {
        Self { mode }
    }
}

impl GroupedJob for StarJob {
    type Input = EdgeRecord;
    type Output = EdgeRecord;

    fn name(&self) -> &'static str {
        match self.mode {
            StarMode::Large => "large-star",
            StarMode::Small => "small-star",
        }
    }

    fn map(&self, edge: &EdgeRecord, ctx: &mut MapContext) -> Result<()> {
        let (u, v) = (edge.node, edge.neighbor);
        if edge.is_isolated() {
            ctx.emit(u, v);
            return Ok(());
        }
        match self.mode {
            StarMode::Large => {
                ctx.emit(u, v);
                ctx.emit(v, u);
            }
            StarMode::Small => ctx.emit(u.max(v), u.min(v)),
        }
        Ok(())
    }

    fn uses_combiner(&self) -> bool {
        true
    }

    fn reduce(&self, group: Group<'_>, ctx: &mut ReduceContext<EdgeRecord>) -> Result<()> {
        let node = group.node();
        let first = match group.first_neighbor() {
            Some(first) if !group.is_isolated() => first,
            _ => {
                ctx.emit(EdgeRecord::isolated(node));
                return Ok(());
            }
        };

        // First neighbor is the smallest (secondary sort).
        let min_label = node.min(first);
        if self.mode == StarMode::Small && node != min_label {
            ctx.emit(EdgeRecord::new(node, min_label));
        }

        let mut emitted = 0u64;
        for neighbor in group.distinct_neighbors() {
            let relabel = match self.mode {
                StarMode::Large => neighbor > node,
                StarMode::Small => neighbor != min_label,
            };
            if relabel {
                ctx.emit(EdgeRecord::new(neighbor, min_label));
                emitted += 1;
            }
        }

        if node != min_label {
            ctx.incr(Counter::NumChanges, emitted);
        }
        Ok(())
    }
}
