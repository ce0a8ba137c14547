//! Safety gate
//!
//! Every action is authorized against a fresh [`RepositoryState`] before it
//! runs. Nothing mutating reaches a repository with unresolved conflicts or
//! an interrupted operation, except the recovery that aborts it.

use fleet_git::{InProgressOperation, RepositoryState};
use serde::Serialize;

/// What the caller intends to do to a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    Status,
    Fetch,
    Pull,
    Push,
    Switch,
    Reset,
    Merge,
    Recover,
}

impl GateAction {
    /// Status and fetch leave HEAD, the index and the working tree alone.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Status | Self::Fetch)
    }
}

/// Caller-selected gate behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GatePolicy {
    /// Abort a conflicted interrupted operation before running a mutating
    /// action, instead of skipping the repository.
    pub auto_recover: bool,
}

/// How to get a repository out of an interrupted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    AbortMerge,
    AbortRebase,
    AbortCherryPick,
}

impl RecoveryAction {
    pub fn for_operation(operation: InProgressOperation) -> Option<Self> {
        match operation {
            InProgressOperation::Merge => Some(Self::AbortMerge),
            InProgressOperation::Rebase => Some(Self::AbortRebase),
            InProgressOperation::CherryPick => Some(Self::AbortCherryPick),
            InProgressOperation::None => None,
        }
    }

    pub fn operation(&self) -> InProgressOperation {
        match self {
            Self::AbortMerge => InProgressOperation::Merge,
            Self::AbortRebase => InProgressOperation::Rebase,
            Self::AbortCherryPick => InProgressOperation::CherryPick,
        }
    }
}

impl std::fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "abort {}", self.operation())
    }
}

/// Gate verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Proceed,
    Skip(String),
    Recover(RecoveryAction),
}

/// Decide whether `action` may run against a repository in `state`.
pub fn authorize(state: &RepositoryState, action: GateAction, policy: &GatePolicy) -> Decision {
    if let Some(recovery) = RecoveryAction::for_operation(state.in_progress) {
        if action == GateAction::Recover {
            return Decision::Recover(recovery);
        }
        if action.is_mutating() {
            if policy.auto_recover && state.has_unresolved_conflicts {
                return Decision::Recover(recovery);
            }
            return Decision::Skip(format!(
                "{} in progress; run recovery to abort it",
                state.in_progress
            ));
        }
        return Decision::Proceed;
    }

    if state.has_unresolved_conflicts && action.is_mutating() && action != GateAction::Recover {
        let count = state.conflicted_paths.len();
        let noun = if count == 1 { "file" } else { "files" };
        return Decision::Skip(format!("{count} conflicting {noun}; resolve manually"));
    }

    match action {
        GateAction::Push if state.is_dirty() => {
            Decision::Skip("uncommitted changes; commit or stash before pushing".to_string())
        }
        GateAction::Reset if state.is_dirty() => Decision::Skip(
            "uncommitted changes would be discarded by reset; commit or stash first".to_string(),
        ),
        GateAction::Recover => Decision::Skip("nothing to recover".to_string()),
        _ => Decision::Proceed,
    }
}
