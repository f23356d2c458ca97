use crate::config::{ConfigError, InputFormat, PipelineConfig};
use crate::controller::ConvergenceController;
use crate::counters::Counter;
use crate::error::{OrchestratorError, Result};
use crate::job::{ControllerState, RoundStats};
use crate::layout::RoundLayout;
use crate::pipeline::{execute_stage, StageContext, StageInput};
use crate::stages::{
    detect_format, CheckReport, CheckStage, ExtractStage, FinishStage, TerminationStage,
};
use serde::Serialize;
use starcc_storage::{RecordPath, RecordStore, StorageError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Statistics of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub job_id: Uuid,
    pub input: RecordPath,
    pub output: RecordPath,
    pub input_format: InputFormat,
    pub initial_nodes: u64,
    pub initial_cliques: u64,
    pub final_nodes: u64,
    pub final_clusters: u64,
    pub partition_ok: bool,
    pub num_errors: u64,
    pub controller: ControllerState,
    pub rounds: usize,
    pub changes: Vec<RoundStats>,
    /// Whether the finishing pass renumbered the output.
    pub finished: bool,
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Converged or capped, and every node in exactly one cluster.
    pub fn is_success(&self) -> bool {
        self.controller.proceeds() && self.partition_ok
    }

    /// The contraction hit the round cap; clusters may be split.
    pub fn is_capped(&self) -> bool {
        matches!(self.controller, ControllerState::Capped { .. })
    }
}

/// Runs Extractor → contraction rounds → Materializer → Checker → finishing
/// pass, strictly in that order.
pub struct PipelineOrchestrator {
    store: Arc<dyn RecordStore>,
    config: Arc<PipelineConfig>,
}

impl PipelineOrchestrator {
    pub fn new(store: Arc<dyn RecordStore>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compute the connected components of `input` into `output`.
    ///
    /// Intermediate rounds are removed whether the run succeeds or fails.
    pub async fn run(&self, input: &RecordPath, output: &RecordPath) -> Result<PipelineReport> {
        let start = Instant::now();
        let ctx = StageContext::new(self.store.clone(), self.config.clone());
        let layout = RoundLayout::new(self.config.work_dir_for(output));

        info!(
            "Starting job {}: {} -> {} ({} partitions, max {} rounds)",
            ctx.job_id, input, output, self.config.partitions, self.config.max_rounds
        );

        self.preflight(input, output, &layout).await?;

        let result = self.run_stages(&ctx, input, output, &layout).await;
        self.cleanup(&ctx, &layout).await;

        match result {
            Ok(mut report) => {
                report.duration_ms = start.elapsed().as_millis() as u64;
                if report.is_capped() {
                    warn!(
                        "Job {}: round cap reached, clusters may not be final",
                        ctx.job_id
                    );
                }
                info!(
                    "Job {} completed - {} nodes in {} clusters after {} rounds, partition ok: {} in {}ms",
                    ctx.job_id,
                    report.final_nodes,
                    report.final_clusters,
                    report.rounds,
                    report.partition_ok,
                    report.duration_ms
                );
                Ok(report)
            }
            Err(e) => {
                error!("Job {} failed ({}): {}", ctx.job_id, e.category(), e);
                Err(e)
            }
        }
    }

    /// Run the Partition Checker alone over a cluster directory.
    pub async fn check(&self, clusters: &RecordPath) -> Result<CheckReport> {
        let ctx = StageContext::new(self.store.clone(), self.config.clone());
        let output = execute_stage(
            &CheckStage::new(),
            StageInput::new(clusters.clone(), None),
            &ctx,
        )
        .await?;
        Ok(CheckReport::from_output(&output))
    }

    async fn preflight(
        &self,
        input: &RecordPath,
        output: &RecordPath,
        layout: &RoundLayout,
    ) -> Result<()> {
        if !self.store.exists(input).await? {
            return Err(StorageError::not_found(input).into());
        }
        if self.store.exists(output).await? {
            return Err(ConfigError::path_exists(
                output,
                "Remove it or choose another output path",
            )
            .into());
        }
        if self.store.exists(layout.work_dir()).await? {
            return Err(ConfigError::path_exists(
                layout.work_dir(),
                "Remove the leftovers of an earlier run or set work_dir",
            )
            .into());
        }
        Ok(())
    }

    async fn run_stages(
        &self,
        ctx: &StageContext,
        input: &RecordPath,
        output: &RecordPath,
        layout: &RoundLayout,
    ) -> Result<PipelineReport> {
        let store = ctx.store.as_ref();

        let input_format = match self.config.input_format {
            Some(format) => format,
            None => detect_format(store, input).await?,
        };
        info!("Job {}: input format {}", ctx.job_id, input_format);

        let extract = execute_stage(
            &ExtractStage::new(input_format),
            StageInput::new(input.clone(), Some(layout.round(0))),
            ctx,
        )
        .await?;

        let outcome = ConvergenceController::new(self.config.max_rounds)
            .run(ctx, layout)
            .await?
            .into_result()?;
        let edges = outcome.edges.clone().ok_or_else(|| {
            OrchestratorError::stage_failed("controller finished without an edge set")
        })?;

        let terminate = execute_stage(
            &TerminationStage::new(),
            StageInput::new(edges.clone(), Some(output.clone())),
            ctx,
        )
        .await?;
        store.delete_subtree(&edges).await?;

        let check = execute_stage(
            &CheckStage::new(),
            StageInput::new(output.clone(), None),
            ctx,
        )
        .await?;
        let verdict = CheckReport::from_output(&check);

        let finished = if !verdict.ok {
            warn!(
                "Job {}: {} node(s) in more than one cluster, output left unfinished",
                ctx.job_id, verdict.num_errors
            );
            false
        } else if self.config.finish {
            execute_stage(
                &FinishStage::new(),
                StageInput::new(output.clone(), None),
                ctx,
            )
            .await?;
            true
        } else {
            false
        };

        Ok(PipelineReport {
            job_id: ctx.job_id,
            input: input.clone(),
            output: output.clone(),
            input_format,
            initial_nodes: extract.counter(Counter::NumInitialNodes),
            initial_cliques: extract.counter(Counter::NumInitialCliques),
            final_nodes: terminate.counter(Counter::NumNodes),
            final_clusters: terminate.counter(Counter::NumClusters),
            partition_ok: verdict.ok,
            num_errors: verdict.num_errors,
            rounds: outcome.state.rounds(),
            controller: outcome.state,
            changes: outcome.history,
            finished,
            duration_ms: 0,
        })
    }

    /// Best-effort removal of the work directory.
    async fn cleanup(&self, ctx: &StageContext, layout: &RoundLayout) {
        match self.store.delete_subtree(layout.work_dir()).await {
            Ok(true) => debug!("Job {}: removed {}", ctx.job_id, layout.work_dir()),
            Ok(false) => {}
            Err(e) => warn!(
                "Job {}: failed to remove {}: {}",
                ctx.job_id,
                layout.work_dir(),
                e
            ),
        }
    }
}
