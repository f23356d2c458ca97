//! Convergence controller: alternates Large-Star and Small-Star rounds until
//! a round pair reports no changes or the round cap is reached.

use crate::counters::Counter;
use crate::error::{OrchestratorError, Result};
use crate::job::{ControllerState, ControllerStateMachine, RoundStats, StageId};
use crate::layout::RoundLayout;
use crate::pipeline::{execute_stage, StageContext, StageInput};
use crate::stages::{StarMode, StarStage};
use starcc_storage::RecordPath;
use tracing::{error, info, warn};

/// Final controller state plus what the next stage needs.
#[derive(Debug)]
pub struct ControllerOutcome {
    pub state: ControllerState,
    pub history: Vec<RoundStats>,
    /// Last produced edge set (CONVERGED or CAPPED only).
    pub edges: Option<RecordPath>,
    /// The stage error that moved the controller to FAILED.
    pub error: Option<OrchestratorError>,
}

impl ControllerOutcome {
    /// Surface a FAILED outcome as its error.
    pub fn into_result(mut self) -> Result<Self> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

pub struct ConvergenceController {
    max_rounds: usize,
}

impl ConvergenceController {
    /// `max_rounds` counts single-mode rounds (two per Large/Small pair).
    pub fn new(max_rounds: usize) -> Self {
        Self { max_rounds }
    }

    /// Drive contraction starting from `layout.round(0)`.
    ///
    /// Each consumed round is deleted once its successor is written. On
    /// failure every round still present is deleted.
    pub async fn run(&self, ctx: &StageContext, layout: &RoundLayout) -> Result<ControllerOutcome> {
        let mut sm = ControllerStateMachine::new();
        let mut i = 0;

        loop {
            if i >= self.max_rounds {
                warn!(
                    "Job {}: round cap {} reached without convergence",
                    ctx.job_id, self.max_rounds
                );
                sm.cap()?;
                break;
            }

            let mut pair_changes = 0;
            for (offset, mode) in [StarMode::Large, StarMode::Small].into_iter().enumerate() {
                let from = layout.round(i + offset);
                let to = layout.round(i + offset + 1);
                let (changes, duration_ms) = match self.round(ctx, mode, &from, &to).await {
                    Ok(done) => done,
                    Err(e) => return self.abort(ctx, layout, sm, mode.stage_id(), i, e).await,
                };
                sm.record_round(mode.stage_id(), changes, duration_ms)?;
                pair_changes += changes;

                if let Err(e) = ctx.store.delete_subtree(&from).await {
                    return self
                        .abort(ctx, layout, sm, mode.stage_id(), i, e.into())
                        .await;
                }
            }
            i += 2;

            info!(
                "Job {}: round pair ending at {} - {} changes",
                ctx.job_id, i, pair_changes
            );
            if pair_changes == 0 {
                sm.converge()?;
                break;
            }
        }

        let (state, history) = sm.into_parts();
        info!(
            "Job {}: controller {} after {} rounds",
            ctx.job_id,
            state.state_name(),
            state.rounds()
        );
        Ok(ControllerOutcome {
            state,
            history,
            edges: Some(layout.round(i)),
            error: None,
        })
    }

    async fn round(
        &self,
        ctx: &StageContext,
        mode: StarMode,
        from: &RecordPath,
        to: &RecordPath,
    ) -> Result<(u64, u64)> {
        let stage = StarStage::new(mode);
        let output = execute_stage(
            &stage,
            StageInput::new(from.clone(), Some(to.clone())),
            ctx,
        )
        .await?;
        Ok((output.counter(Counter::NumChanges), output.metrics.duration_ms))
    }

    async fn abort(
        &self,
        ctx: &StageContext,
        layout: &RoundLayout,
        mut sm: ControllerStateMachine,
        stage: StageId,
        pair_start: usize,
        e: OrchestratorError,
    ) -> Result<ControllerOutcome> {
        sm.fail(stage, &e)?;
        error!(
            "Job {}: controller failed in {} at round {}: {}",
            ctx.job_id,
            stage,
            sm.state().rounds(),
            e
        );

        for index in pair_start..=pair_start + 2 {
            let path = layout.round(index);
            if let Err(cleanup) = ctx.store.delete_subtree(&path).await {
                warn!("Failed to remove round {}: {}", path, cleanup);
            }
        }

        let (state, history) = sm.into_parts();
        Ok(ControllerOutcome {
            state,
            history,
            edges: None,
            error: Some(e),
        })
    }
}
