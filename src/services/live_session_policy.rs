use crate::db::types::LiveSessionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Requested status equals the current one.
    Unchanged,
    Apply,
}

/// `None` means the move is not allowed.
pub(crate) fn check_transition(
    from: LiveSessionStatus,
    to: LiveSessionStatus,
) -> Option<Transition> {
    use LiveSessionStatus::{Cancelled, Ended, Live, Scheduled};

    if from == to {
        return Some(Transition::Unchanged);
    }

    match (from, to) {
        (Scheduled, Live) | (Scheduled, Cancelled) | (Live, Ended) | (Live, Cancelled) => {
            Some(Transition::Apply)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LiveSessionStatus::{Cancelled, Ended, Live, Scheduled};

    #[test]
    fn forward_moves_are_allowed() {
        assert_eq!(check_transition(Scheduled, Live), Some(Transition::Apply));
        assert_eq!(check_transition(Scheduled, Cancelled), Some(Transition::Apply));
        assert_eq!(check_transition(Live, Ended), Some(Transition::Apply));
        assert_eq!(check_transition(Live, Cancelled), Some(Transition::Apply));
    }

    #[test]
    fn same_state_is_a_no_op() {
        for status in [Scheduled, Live, Ended, Cancelled] {
            assert_eq!(check_transition(status, status), Some(Transition::Unchanged));
        }
    }

    #[test]
    fn closed_sessions_cannot_reopen() {
        assert_eq!(check_transition(Ended, Live), None);
        assert_eq!(check_transition(Cancelled, Scheduled), None);
        assert_eq!(check_transition(Live, Scheduled), None);
        assert_eq!(check_transition(Scheduled, Ended), None);
    }
}
