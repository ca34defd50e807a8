//! One check cycle: which mailboxes were checked and what they reported.

use std::collections::{BTreeMap, BTreeSet};

use checkmails_mime::HeaderSummary;

use crate::connection::MessageId;

/// Title of the unread-count notifications.
pub const UNREAD_TITLE: &str = "Unread mails";
/// Body of a forced notification when nothing is unread.
pub const NO_UNREAD: &str = "No unread mail";
/// Summary shown before the first cycle completes.
pub const CHECKING: &str = "Checking...";
/// Summary shown while suspended.
pub const SUSPENDED: &str = "Check suspended";
/// Title and summary when no mailbox is active.
pub const NO_ACTIVE_MAILBOX: &str = "No active mailbox";
/// Body of the error notification on connectivity loss.
pub const NO_INTERNET: &str = "No Internet connection.";
/// Title of error notifications.
pub const ERROR_TITLE: &str = "Error";

/// Accumulator of one check phase.
#[derive(Debug, Default)]
pub(crate) struct Cycle {
    pub(crate) force_notify: bool,
    /// Unread counts of the checks that completed, by mailbox name.
    pub(crate) results: BTreeMap<String, usize>,
}

impl Cycle {
    pub(crate) fn new(force_notify: bool) -> Self {
        Self {
            force_notify,
            ..Self::default()
        }
    }

    /// Records the result of a check that completed during this cycle,
    /// including one launched before it started.
    pub(crate) fn record(&mut self, mailbox: &str, unread: usize) {
        self.results.insert(mailbox.to_string(), unread);
    }

    /// `"A : 3, B : 1"` for the mailboxes with unread mail, in name order.
    pub(crate) fn summary(&self) -> String {
        self.entries().collect::<Vec<_>>().join(", ")
    }

    /// Summary followed by a failure entry for `mailbox`.
    pub(crate) fn summary_with_failure(&self, mailbox: &str) -> String {
        self.entries()
            .chain(std::iter::once(format!("{mailbox} : Timed out, reconnecting")))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn entries(&self) -> impl Iterator<Item = String> + '_ {
        self.results
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, count)| format!("{name} : {count}"))
    }
}

/// Identifiers present in `current` but not in `previous`, in ascending
/// order.
pub fn newly_arrived(
    previous: &BTreeSet<MessageId>,
    current: &BTreeSet<MessageId>,
) -> Vec<MessageId> {
    current.difference(previous).copied().collect()
}

/// Title and body of the notification for one new message.
pub(crate) fn message_notification(mailbox: &str, header: &HeaderSummary) -> (String, String) {
    (
        format!("{} [{mailbox}]", header.subject),
        format!("From: {}\nDate: {}", header.from, header.date),
    )
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn ids(values: &[u32]) -> BTreeSet<MessageId> {
        values.iter().copied().map(MessageId).collect()
    }

    #[test]
    fn test_newly_arrived() {
        assert_eq!(newly_arrived(&ids(&[1, 2, 3]), &ids(&[2, 3, 4])), vec![MessageId(4)]);
        assert!(newly_arrived(&ids(&[1, 2, 3]), &ids(&[2, 3])).is_empty());
        assert_eq!(newly_arrived(&ids(&[]), &ids(&[5, 1])), vec![MessageId(1), MessageId(5)]);
    }

    #[test]
    fn test_summary_skips_empty() {
        let mut cycle = Cycle::new(false);
        cycle.record("B", 1);
        cycle.record("A", 3);
        cycle.record("C", 0);

        assert_eq!(cycle.summary(), "A : 3, B : 1");
        assert_eq!(
            cycle.summary_with_failure("C"),
            "A : 3, B : 1, C : Timed out, reconnecting"
        );
    }

    #[test]
    fn test_empty_cycle() {
        let cycle = Cycle::new(true);
        assert_eq!(cycle.summary(), "");
        assert_eq!(cycle.summary_with_failure("D"), "D : Timed out, reconnecting");
    }

    #[test]
    fn test_message_notification() {
        let header = HeaderSummary {
            subject: "Lunch?".to_string(),
            from: "Bob <bob@example.org>".to_string(),
            date: "Tue 03 Mar 2026, 10:00".to_string(),
        };
        let (title, body) = message_notification("Work", &header);
        assert_eq!(title, "Lunch? [Work]");
        assert_eq!(body, "From: Bob <bob@example.org>\nDate: Tue 03 Mar 2026, 10:00");
    }

    proptest! {
        #[test]
        fn arrivals_are_exactly_the_new_ids(
            previous in prop::collection::btree_set(1u32..200, 0..40),
            current in prop::collection::btree_set(1u32..200, 0..40),
        ) {
            let previous: BTreeSet<MessageId> = previous.into_iter().map(MessageId).collect();
            let current: BTreeSet<MessageId> = current.into_iter().map(MessageId).collect();
            let arrived = newly_arrived(&previous, &current);

            prop_assert!(arrived.windows(2).all(|w| w[0] < w[1]));
            for id in &current {
                prop_assert_eq!(arrived.contains(id), !previous.contains(id));
            }
            prop_assert!(arrived.iter().all(|id| current.contains(id)));
        }

        #[test]
        fn shrinking_never_fetches(
            current in prop::collection::btree_set(1u32..200, 0..40),
            extra in prop::collection::btree_set(1u32..200, 0..10),
        ) {
            let current: BTreeSet<MessageId> = current.into_iter().map(MessageId).collect();
            let mut previous = current.clone();
            previous.extend(extra.into_iter().map(MessageId));

            prop_assert!(newly_arrived(&previous, &current).is_empty());
        }
    }
}
