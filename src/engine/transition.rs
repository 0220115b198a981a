use crate::store::models::TaskStatus;

/// Whether a task may move from `from` (`None` at creation) to `to`. Shared
/// by the Store Gateway (enforced at the SQL layer via a conditional
/// `UPDATE ... WHERE status = $expected`) and the Task Engine (checked
/// before issuing the write, so a doomed transition never reaches the
/// database).
#[must_use]
pub fn validate(from: Option<TaskStatus>, to: TaskStatus) -> bool {
    use TaskStatus::{Cancelled, Completed, Failed, Paused, Pending, Recurring, Running, Scheduled};

    match (from, to) {
        (None, Pending | Scheduled | Recurring) => true,
        (Some(Pending), Running | Cancelled) => true,
        (Some(Running), Completed | Failed | Cancelled | Paused) => true,
        (Some(Paused), Running | Cancelled) => true,
        (Some(Scheduled), Pending | Cancelled) => true,
        (Some(Recurring), Pending | Cancelled) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::{Cancelled, Completed, Failed, Paused, Pending, Recurring, Running, Scheduled};

    #[test]
    fn creation_only_allows_queueable_statuses() {
        assert!(validate(None, Pending));
        assert!(validate(None, Scheduled));
        assert!(validate(None, Recurring));
        assert!(!validate(None, Running));
        assert!(!validate(None, Completed));
    }

    #[test]
    fn pending_moves_to_running_or_cancelled_only() {
        assert!(validate(Some(Pending), Running));
        assert!(validate(Some(Pending), Cancelled));
        assert!(!validate(Some(Pending), Completed));
        assert!(!validate(Some(Pending), Paused));
    }

    #[test]
    fn running_reaches_every_terminal_status_and_pauses() {
        assert!(validate(Some(Running), Completed));
        assert!(validate(Some(Running), Failed));
        assert!(validate(Some(Running), Cancelled));
        assert!(validate(Some(Running), Paused));
        assert!(!validate(Some(Running), Pending));
    }

    #[test]
    fn paused_round_trips_to_running() {
        assert!(validate(Some(Paused), Running));
        assert!(validate(Some(Paused), Cancelled));
        assert!(!validate(Some(Paused), Completed));
    }

    #[test]
    fn terminal_statuses_are_dead_ends() {
        for terminal in [Completed, Failed, Cancelled] {
            for to in [Pending, Running, Completed, Failed, Cancelled, Paused] {
                assert!(!validate(Some(terminal), to), "{terminal:?} -> {to:?}");
            }
        }
    }
}
