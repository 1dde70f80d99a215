//! Restore lifecycle transitions.
//!
//! Records move forward only: once a restore or keyspace row reaches a
//! terminal state it is never reopened.

use crate::types::RestoreState;

/// Outcome of applying a state change to a persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State changed
    Applied {
        /// Previous state
        from: RestoreState,
    },
    /// Record already in the requested state
    Unchanged,
    /// Record is terminal in a different state; the request was ignored
    Rejected {
        /// State the record stays in
        current: RestoreState,
    },
}

impl Transition {
    /// Whether the record now holds the requested state
    #[inline]
    #[must_use]
    pub fn holds_target(self) -> bool {
        matches!(self, Self::Applied { .. } | Self::Unchanged)
    }
}

/// States reachable from `from` in one step.
pub fn allowed_transitions(from: RestoreState) -> Vec<RestoreState> {
    use RestoreState::*;
    match from {
        Created => vec![InProgress, Success, Failure, Aborted],
        InProgress => vec![Success, Failure, Aborted],
        Success | Failure | Aborted => vec![],
    }
}

/// Decide what happens when a record in `current` is asked to move to `to`.
pub fn resolve(current: RestoreState, to: RestoreState) -> Transition {
    if current == to {
        Transition::Unchanged
    } else if allowed_transitions(current).contains(&to) {
        Transition::Applied { from: current }
    } else {
        Transition::Rejected { current }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_progress_reaches_every_terminal_state() {
        for to in [RestoreState::Success, RestoreState::Failure, RestoreState::Aborted] {
            assert_eq!(
                resolve(RestoreState::InProgress, to),
                Transition::Applied {
                    from: RestoreState::InProgress
                }
            );
        }
    }

    #[test]
    fn terminal_states_are_final() {
        assert_eq!(
            resolve(RestoreState::Success, RestoreState::Failure),
            Transition::Rejected {
                current: RestoreState::Success
            }
        );
        assert_eq!(
            resolve(RestoreState::Aborted, RestoreState::InProgress),
            Transition::Rejected {
                current: RestoreState::Aborted
            }
        );
    }

    #[test]
    fn same_state_is_unchanged() {
        assert_eq!(
            resolve(RestoreState::Failure, RestoreState::Failure),
            Transition::Unchanged
        );
        assert!(Transition::Unchanged.holds_target());
    }
}
