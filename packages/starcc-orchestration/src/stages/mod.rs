// Stage implementations
pub mod check_stage;
pub mod extract_stage;
pub mod finish_stage;
pub mod star_stage;
pub mod termination_stage;

// Re-exports
pub use check_stage::{CheckJob, CheckReport, CheckStage};
pub use extract_stage::{detect_format, ExtractStage, Row};
pub use finish_stage::{cluster_file_name, FinishStage};
pub use star_stage::{StarJob, StarMode, StarStage};
pub use termination_stage::{TerminationJob, TerminationStage};
