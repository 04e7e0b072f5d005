// src/tree/status.rs

use std::fmt;

use serde::Serialize;

/// Lifecycle of a node's worker.
///
/// ```text
/// undone ──► ready ──► working ──► done
///              ▲  │        │  ▲
///              │  ▼        │  └── waiting   (dispatcher with live children)
///           nothread       ▼
///              queued_repeat ──► ready
/// ```
///
/// `ready ──► done` is allowed for tasks the scheduler skips. `done` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Undone,
    Ready,
    Nothread,
    Working,
    Done,
    QueuedRepeat,
    Waiting,
}

impl WorkerStatus {
    pub fn can_transition_to(self, to: WorkerStatus) -> bool {
        use WorkerStatus::*;
        matches!(
            (self, to),
            (Undone, Ready)
                | (QueuedRepeat, Ready)
                | (Nothread, Ready)
                | (Ready, Working)
                | (Ready, Nothread)
                | (Ready, Done)
                | (Working, Done)
                | (Working, QueuedRepeat)
                | (Working, Waiting)
                | (Waiting, Done)
        )
    }

    pub fn is_done(self) -> bool {
        self == WorkerStatus::Done
    }

    /// States from which a node may be promoted to `ready` once its
    /// dependencies are done.
    pub fn awaits_readiness(self) -> bool {
        matches!(
            self,
            WorkerStatus::Undone | WorkerStatus::QueuedRepeat | WorkerStatus::Nothread
        )
    }
}

impl Default for WorkerStatus {
    fn default() -> Self {
        WorkerStatus::Undone
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerStatus::Undone => "undone",
            WorkerStatus::Ready => "ready",
            WorkerStatus::Nothread => "nothread",
            WorkerStatus::Working => "working",
            WorkerStatus::Done => "done",
            WorkerStatus::QueuedRepeat => "queued_repeat",
            WorkerStatus::Waiting => "waiting",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::WorkerStatus::*;
    use super::*;

    const ALL: [WorkerStatus; 7] = [Undone, Ready, Nothread, Working, Done, QueuedRepeat, Waiting];

    #[test]
    fn done_is_terminal() {
        for to in ALL {
            assert!(!Done.can_transition_to(to), "done -> {to} must be rejected");
        }
    }

    #[test]
    fn rejection_cycle_returns_through_ready() {
        assert!(Working.can_transition_to(QueuedRepeat));
        assert!(QueuedRepeat.can_transition_to(Ready));
        assert!(!QueuedRepeat.can_transition_to(Working));
    }

    #[test]
    fn undone_cannot_skip_ready() {
        assert!(!Undone.can_transition_to(Working));
        assert!(!Undone.can_transition_to(Done));
    }
}
