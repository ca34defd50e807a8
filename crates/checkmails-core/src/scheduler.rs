//! Cancellable one-shot timers delivered to an event loop.
//!
//! Every timer is a sleeping task that posts its event into a channel owned
//! by the loop. Cancelling aborts the task; a timer whose message was already
//! queued when it got cancelled is filtered out by [`Scheduler::accept`], so
//! a cancelled timer never acts.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handle of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// A timer that went off.
#[derive(Debug)]
pub struct Fired<E> {
    /// Timer that fired.
    pub id: TimerId,
    /// Event it carries.
    pub event: E,
}

/// One-shot timer queue.
#[derive(Debug)]
pub struct Scheduler<E> {
    tx: mpsc::UnboundedSender<Fired<E>>,
    armed: HashMap<TimerId, JoinHandle<()>>,
    next_id: u64,
}

impl<E: Send + 'static> Scheduler<E> {
    /// Creates a scheduler and the receiver its timers fire into.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Fired<E>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            armed: HashMap::new(),
            next_id: 0,
        };
        (scheduler, rx)
    }

    /// Arms a timer delivering `event` after `delay`.
    pub fn after(&mut self, delay: Duration, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Fired { id, event });
        });
        self.armed.insert(id, task);
        id
    }

    /// Cancels a timer. Unknown, fired or already cancelled timers are
    /// ignored.
    pub fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.armed.remove(&id) {
            task.abort();
        }
    }

    /// Cancels the timer held in `slot`, if any, and clears the slot.
    pub fn cancel_slot(&mut self, slot: &mut Option<TimerId>) {
        if let Some(id) = slot.take() {
            self.cancel(id);
        }
    }

    /// Cancels every armed timer.
    pub fn cancel_all(&mut self) {
        for (_, task) in self.armed.drain() {
            task.abort();
        }
    }

    /// Marks a fired timer as handled.
    ///
    /// Returns false if the timer was cancelled after its message had been
    /// queued; the message must then be dropped.
    pub fn accept(&mut self, id: TimerId) -> bool {
        self.armed.remove(&id).is_some()
    }

    /// Returns true if the timer is armed and has not been handled yet.
    #[must_use]
    pub fn is_armed(&self, id: TimerId) -> bool {
        self.armed.contains_key(&id)
    }
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
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let id = scheduler.after(Duration::from_secs(20), "tick");
        assert!(scheduler.is_armed(id));

        let start = tokio::time::Instant::now();
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.id, id);
        assert_eq!(fired.event, "tick");
        assert!(start.elapsed() >= Duration::from_secs(20));

        assert!(scheduler.accept(id));
        assert!(!scheduler.is_armed(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let id = scheduler.after(Duration::from_secs(1), 1);
        scheduler.cancel(id);
        scheduler.cancel(id);

        let mut slot = None;
        scheduler.cancel_slot(&mut slot);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_fire_rejects_message() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let mut slot = Some(scheduler.after(Duration::from_secs(1), 7));

        let fired = rx.recv().await.unwrap();
        scheduler.cancel_slot(&mut slot);

        assert!(slot.is_none());
        assert!(!scheduler.accept(fired.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let (mut scheduler, mut rx) = Scheduler::new();
        scheduler.after(Duration::from_secs(1), 'a');
        scheduler.after(Duration::from_secs(2), 'b');
        scheduler.cancel_all();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
