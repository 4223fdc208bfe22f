/// Orchestrator phase definitions
///
/// This module defines the phases the batch loop moves through and which
/// moves between them are legal.
use std::fmt;

/// Represents the current phase of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    // ===== Active Phases =====
    /// Loading the checkpoint and planning batches
    Init,

    /// About to start, or running, the next batch
    RunningBatch,

    /// Waiting for resource pressure (or an operator pause) to clear
    PausedResource,

    /// Persisting the global checkpoint after a batch
    Checkpointing,

    /// A stop signal was observed; leaving state consistent
    Stopping,

    // ===== Terminal Phases =====
    /// Every planned batch is recorded
    Completed,

    /// Stopped on request; resumable
    CompletedPartial,

    /// Stopped on a fatal error; resumable once the cause is fixed
    Failed,
}

impl Phase {
    /// Returns true if the loop ends in this phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::CompletedPartial | Self::Failed)
    }

    /// Returns true if a stop signal moves this phase to `Stopping`
    pub fn is_stoppable(&self) -> bool {
        matches!(
            self,
            Self::Init | Self::RunningBatch | Self::PausedResource | Self::Checkpointing
        )
    }

    /// Returns true if the loop may move from this phase to `next`
    ///
    /// Any non-terminal phase may fail.
    pub fn can_transition_to(&self, next: Phase) -> bool {
        if next == Self::Failed {
            return !self.is_terminal();
        }
        if next == Self::Stopping {
            return self.is_stoppable();
        }

        match self {
            Self::Init => matches!(next, Self::RunningBatch | Self::Completed),
            Self::RunningBatch => {
                matches!(
                    next,
                    Self::RunningBatch | Self::PausedResource | Self::Checkpointing
                )
            }
            Self::PausedResource => matches!(next, Self::RunningBatch | Self::PausedResource),
            Self::Checkpointing => matches!(next, Self::RunningBatch | Self::Completed),
            Self::Stopping => matches!(next, Self::CompletedPartial),
            Self::Completed | Self::CompletedPartial | Self::Failed => false,
        }
    }

    /// Returns a stable lowercase name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::RunningBatch => "running_batch",
            Self::PausedResource => "paused_resource",
            Self::Checkpointing => "checkpointing",
            Self::Stopping => "stopping",
            Self::Completed => "completed",
            Self::CompletedPartial => "completed_partial",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
