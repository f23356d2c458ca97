use crate::error::{ErrorCategory, OrchestratorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Extract,
    LargeStar,
    SmallStar,
    Terminate,
    Check,
    Finish,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Extract => "extract",
            StageId::LargeStar => "large_star",
            StageId::SmallStar => "small_star",
            StageId::Terminate => "terminate",
            StageId::Check => "check",
            StageId::Finish => "finish",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-round statistics kept by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    /// Index of the round this pass produced (1-based).
    pub round: usize,
    pub mode: StageId,
    pub changes: u64,
    pub duration_ms: u64,
}

/// Convergence controller state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerState {
    Running {
        started_at: DateTime<Utc>,
        round: usize,
    },
    Converged {
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        rounds: usize,
    },
    /// Round cap reached without convergence. The last edge set may not be
    /// a fixed point.
    Capped {
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        rounds: usize,
    },
    Failed {
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
        round: usize,
        failed_stage: StageId,
        error: String,
        error_category: ErrorCategory,
    },
}

impl ControllerState {
    pub fn state_name(&self) -> &'static str {
        match self {
            ControllerState::Running { .. } => "running",
            ControllerState::Converged { .. } => "converged",
            ControllerState::Capped { .. } => "capped",
            ControllerState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ControllerState::Running { .. })
    }

    /// Converged and capped runs both go on to materialization.
    pub fn proceeds(&self) -> bool {
        matches!(
            self,
            ControllerState::Converged { .. } | ControllerState::Capped { .. }
        )
    }

    /// Single-mode rounds completed so far.
    pub fn rounds(&self) -> usize {
        match self {
            ControllerState::Running { round, .. } | ControllerState::Failed { round, .. } => {
                *round
            }
            ControllerState::Converged { rounds, .. } | ControllerState::Capped { rounds, .. } => {
                *rounds
            }
        }
    }
}

/// Controller state machine for transitions
#[derive(Debug, Clone)]
pub struct ControllerStateMachine {
    state: ControllerState,
    history: Vec<RoundStats>,
}

impl ControllerStateMachine {
    /// New machine in RUNNING at round 0.
    pub fn new() -> Self {
        Self {
            state: ControllerState::Running {
                started_at: Utc::now(),
                round: 0,
            },
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn history(&self) -> &[RoundStats] {
        &self.history
    }

    pub fn into_parts(self) -> (ControllerState, Vec<RoundStats>) {
        (self.state, self.history)
    }

    fn invalid(&self, to: &str) -> OrchestratorError {
        OrchestratorError::InvalidStateTransition {
            from: self.state.state_name().to_string(),
            to: to.to_string(),
        }
    }

    /// Transition: RUNNING → RUNNING (one single-mode round done)
    pub fn record_round(&mut self, mode: StageId, changes: u64, duration_ms: u64) -> Result<()> {
        match &mut self.state {
            ControllerState::Running { round, .. } => {
                *round += 1;
                self.history.push(RoundStats {
                    round: *round,
                    mode,
                    changes,
                    duration_ms,
                });
                Ok(())
            }
            _ => Err(self.invalid("running")),
        }
    }

    /// Transition: RUNNING → CONVERGED
    pub fn converge(&mut self) -> Result<()> {
        match &self.state {
            ControllerState::Running { started_at, round } => {
                self.state = ControllerState::Converged {
                    started_at: *started_at,
                    finished_at: Utc::now(),
                    rounds: *round,
                };
                Ok(())
            }
            _ => Err(self.invalid("converged")),
        }
    }

    /// Transition: RUNNING → CAPPED
    pub fn cap(&mut self) -> Result<()> {
        match &self.state {
            ControllerState::Running { started_at, round } => {
                self.state = ControllerState::Capped {
                    started_at: *started_at,
                    finished_at: Utc::now(),
                    rounds: *round,
                };
                Ok(())
            }
            _ => Err(self.invalid("capped")),
        }
    }

    /// Transition: RUNNING → FAILED
    pub fn fail(&mut self, failed_stage: StageId, error: &OrchestratorError) -> Result<()> {
        match &self.state {
            ControllerState::Running { started_at, round } => {
                self.state = ControllerState::Failed {
                    started_at: *started_at,
                    failed_at: Utc::now(),
                    round: *round,
                    failed_stage,
                    error: error.to_string(),
                    error_category: error.category(),
                };
                Ok(())
            }
            _ => Err(self.invalid("failed")),
        }
    }
}

impl Default for ControllerStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
