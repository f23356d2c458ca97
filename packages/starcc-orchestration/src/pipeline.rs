use crate::config::PipelineConfig;
use crate::counters::{Counter, Counters};
use crate::error::Result;
use crate::job::StageId;
use crate::substrate::{JobReport, JobSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use starcc_storage::{RecordPath, RecordStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Stage context passed to handlers
#[derive(Clone)]
pub struct StageContext {
    pub job_id: Uuid,
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<PipelineConfig>,
}

impl StageContext {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<PipelineConfig>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            store,
            config,
        }
    }

    /// Substrate settings derived from the pipeline config.
    pub fn job_settings(&self) -> JobSettings {
        JobSettings::new(self.config.partitions, self.config.combiner)
    }
}

/// Stage input
#[derive(Debug, Clone)]
pub struct StageInput {
    /// Record sets (or plain files) to read
    pub inputs: Vec<RecordPath>,
    /// Where the stage publishes its output, if it writes any
    pub output: Option<RecordPath>,
}

impl StageInput {
    pub fn new(input: RecordPath, output: Option<RecordPath>) -> Self {
        Self {
            inputs: vec![input],
            output,
        }
    }
}

/// Stage output
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    pub counters: Counters,
    pub output: Option<RecordPath>,
    pub metrics: StageMetrics,
}

impl StageOutput {
    pub fn from_report(report: JobReport) -> Self {
        let metrics = StageMetrics {
            records_in: report.counters.get(Counter::MapInputRecords),
            records_out: report.counters.get(Counter::ReduceOutputRecords),
            duration_ms: report.duration_ms,
        };
        Self {
            counters: report.counters,
            output: report.output,
            metrics,
        }
    }

    pub fn counter(&self, counter: Counter) -> u64 {
        self.counters.get(counter)
    }
}

/// Stage metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub records_in: u64,
    pub records_out: u64,
    pub duration_ms: u64,
}

/// Stage handler trait (pluggable stages)
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Stage identifier
    fn stage_id(&self) -> StageId;

    /// Execute stage
    async fn execute(&self, input: StageInput, ctx: &StageContext) -> Result<StageOutput>;
}

/// Execute one stage with timing and logging.
pub async fn execute_stage(
    handler: &dyn StageHandler,
    input: StageInput,
    ctx: &StageContext,
) -> Result<StageOutput> {
    let stage_id = handler.stage_id();
    let start = Instant::now();

    match handler.execute(input, ctx).await {
        Ok(mut output) => {
            output.metrics.duration_ms = start.elapsed().as_millis() as u64;
            info!(
                "Job {}: Stage {} completed - {} records in, {} out in {}ms [{}]",
                ctx.job_id,
                stage_id,
                output.metrics.records_in,
                output.metrics.records_out,
                output.metrics.duration_ms,
                output.counters
            );
            Ok(output)
        }
        Err(e) => {
            error!("Job {}: Stage {} failed: {}", ctx.job_id, stage_id, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestratorError;
    use starcc_storage::MemoryRecordStore;

    // Mock stage handler for testing
    struct MockStage {
        id: StageId,
        should_fail: bool,
    }

    #[async_trait]
    impl StageHandler for MockStage {
        fn stage_id(&self) -> StageId {
            self.id
        }

        async fn execute(&self, input: StageInput, _ctx: &StageContext) -> Result<StageOutput> {
            if self.should_fail {
                return Err(OrchestratorError::stage_failed("Mock failure"));
            }
            let mut counters = Counters::new();
            counters.incr(Counter::NumChanges, input.inputs.len() as u64);
            Ok(StageOutput {
                counters,
                output: input.output,
                metrics: StageMetrics {
                    records_in: 10,
                    records_out: 5,
                    duration_ms: 0,
                },
            })
        }
    }

    fn context() -> StageContext {
        StageContext::new(
            Arc::new(MemoryRecordStore::new()),
            Arc::new(PipelineConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_execute_stage_success() {
        let stage = MockStage {
            id: StageId::LargeStar,
            should_fail: false,
        };
        let input = StageInput::new(RecordPath::new("in"), Some(RecordPath::new("out")));

        let output = execute_stage(&stage, input, &context()).await.unwrap();
        assert_eq!(output.counter(Counter::NumChanges), 1);
        assert_eq!(output.metrics.records_in, 10);
        assert_eq!(output.output, Some(RecordPath::new("out")));
    }

    #[tokio::test]
    async fn test_execute_stage_failure() {
        let stage = MockStage {
            id: StageId::Check,
            should_fail: true,
        };
        let input = StageInput::new(RecordPath::new("in"), None);

        let result = execute_stage(&stage, input, &context()).await;
        assert!(matches!(
            result,
            Err(OrchestratorError::StageExecutionFailed(_))
        ));
    }

    #[test]
    fn test_stage_output_from_report() {
        let mut counters = Counters::new();
        counters.incr(Counter::MapInputRecords, 7);
        counters.incr(Counter::ReduceOutputRecords, 3);
        let output = StageOutput::from_report(JobReport {
            counters,
            output: None,
            duration_ms: 12,
        });
        assert_eq!(
            output.metrics,
            StageMetrics {
                records_in: 7,
                records_out: 3,
                duration_ms: 12,
            }
        );
    }

    #[test]
    fn test_job_settings_follow_config() {
        let ctx = context();
        let settings = ctx.job_settings();
        assert_eq!(settings.partitions, ctx.config.partitions);
        assert!(settings.combiner.enabled);
    }
}
