/*
 * StarCC Orchestration - connected components by star contraction
 *
 * Alternates Large-Star and Small-Star rounds over an edge list until a
 * round pair changes nothing, then materializes one cluster per component.
 *
 * Architecture:
 * - Grouped compute substrate (rayon map/shuffle/reduce, atomic outputs)
 * - Pipeline stages (extract, star rounds, terminate, check, finish)
 * - Convergence controller state machine
 * - Record storage (starcc-storage)
 */

// Public modules
pub mod clusters;
pub mod combiner;
pub mod config;
pub mod controller;
pub mod counters;
pub mod error;
pub mod job;
pub mod layout;
pub mod orchestrator;
pub mod pipeline;
pub mod shuffle;
pub mod stages;
pub mod substrate;
pub mod translate;

// Re-exports
pub use clusters::Clusters;
pub use combiner::{DedupCombiner, EntryBudget, MemoryProbe};
pub use config::{CombinerConfig, ConfigError, InputFormat, PipelineConfig};
pub use controller::{ControllerOutcome, ConvergenceController};
pub use counters::{Counter, Counters};
pub use error::{ErrorCategory, OrchestratorError, Result};
pub use job::{ControllerState, ControllerStateMachine, RoundStats, StageId};
pub use layout::RoundLayout;
pub use orchestrator::{PipelineOrchestrator, PipelineReport};
pub use pipeline::{StageContext, StageHandler, StageInput, StageMetrics, StageOutput};
pub use shuffle::{partition_for, Group, NodesPair, SortedPartition};
pub use stages::{
    CheckReport, CheckStage, ExtractStage, FinishStage, StarMode, StarStage, TerminationStage,
};
pub use substrate::{run_job, GroupedJob, JobReport, JobSettings};
pub use translate::{translate, TranslationKind};
