use crate::LifecycleError;
use serde::Serialize;
use std::fmt;

/// States of one PR lifecycle run.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Idle,
    PrCheck,
    PrPush,
    PrCreateOrReuse,
    Review,
    MergeDecision,
    MergeExecute,
    StatusSync,
    Done,
    Failed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::PrCheck => "PR_CHECK",
            Self::PrPush => "PR_PUSH",
            Self::PrCreateOrReuse => "PR_CREATE_OR_REUSE",
            Self::Review => "REVIEW",
            Self::MergeDecision => "MERGE_DECISION",
            Self::MergeExecute => "MERGE_EXECUTE",
            Self::StatusSync => "STATUS_SYNC",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Valid transitions ──

use LifecycleState as S;

const VALID_TRANSITIONS: &[(LifecycleState, &[LifecycleState])] = &[
    (S::Idle, &[S::PrCheck, S::Done]),
    (S::PrCheck, &[S::PrPush]),
    (S::PrPush, &[S::PrCreateOrReuse]),
    (
        S::PrCreateOrReuse,
        &[S::Review, S::MergeDecision, S::StatusSync],
    ),
    (S::Review, &[S::MergeDecision, S::StatusSync]),
    (S::MergeDecision, &[S::MergeExecute, S::StatusSync]),
    (S::MergeExecute, &[S::StatusSync]),
    (S::StatusSync, &[S::Done]),
    // Done and Failed are terminal
];

/// Any non-terminal state may fail.
pub fn is_valid_transition(from: LifecycleState, to: LifecycleState) -> bool {
    if to == S::Failed {
        return !from.is_terminal();
    }
    VALID_TRANSITIONS
        .iter()
        .any(|(f, targets)| *f == from && targets.contains(&to))
}

/// Current state plus every state entered so far.
#[derive(Debug, Clone)]
pub struct LifecycleRun {
    state: LifecycleState,
    history: Vec<LifecycleState>,
}

impl Default for LifecycleRun {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleRun {
    pub fn new() -> Self {
        Self {
            state: S::Idle,
            history: vec![S::Idle],
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    pub fn visited(&self, state: LifecycleState) -> bool {
        self.history.contains(&state)
    }

    pub fn advance(&mut self, to: LifecycleState) -> Result<(), LifecycleError> {
        if !is_valid_transition(self.state, to) {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!(from = %self.state, to = %to, "lifecycle transition");
        self.state = to;
        self.history.push(to);
        Ok(())
    }

    /// Move to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = S::Failed;
            self.history.push(S::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_path_is_valid() {
        let mut run = LifecycleRun::new();
        for to in [
            S::PrCheck,
            S::PrPush,
            S::PrCreateOrReuse,
            S::Review,
            S::MergeDecision,
            S::MergeExecute,
            S::StatusSync,
            S::Done,
        ] {
            run.advance(to).unwrap();
        }
        assert_eq!(run.state(), S::Done);
        assert_eq!(run.history().len(), 9);
    }

    #[test]
    fn disabled_creation_goes_straight_to_done() {
        let mut run = LifecycleRun::new();
        run.advance(S::Done).unwrap();
        assert!(!run.visited(S::PrCheck));
    }

    #[test]
    fn cannot_skip_push() {
        let mut run = LifecycleRun::new();
        run.advance(S::PrCheck).unwrap();
        let err = run.advance(S::PrCreateOrReuse).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                from: S::PrCheck,
                to: S::PrCreateOrReuse
            }
        ));
        assert_eq!(run.state(), S::PrCheck);
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(!is_valid_transition(S::Done, S::PrCheck));
        assert!(!is_valid_transition(S::Done, S::Failed));
        assert!(!is_valid_transition(S::Failed, S::Idle));
        let mut run = LifecycleRun::new();
        run.advance(S::PrCheck).unwrap();
        run.fail();
        run.fail();
        assert_eq!(run.state(), S::Failed);
        assert_eq!(run.history(), &[S::Idle, S::PrCheck, S::Failed]);
    }

    #[test]
    fn execute_only_after_decision() {
        assert!(!is_valid_transition(S::PrCreateOrReuse, S::MergeExecute));
        assert!(!is_valid_transition(S::Review, S::MergeExecute));
        assert!(is_valid_transition(S::MergeDecision, S::MergeExecute));
    }

    #[test]
    fn state_names() {
        assert_eq!(S::PrCreateOrReuse.to_string(), "PR_CREATE_OR_REUSE");
        assert_eq!(
            serde_json::to_string(&S::StatusSync).unwrap(),
            "\"STATUS_SYNC\""
        );
    }
}
