//! Per-mailbox runtime state.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::backoff::Backoff;
use crate::connection::MessageId;
use crate::credentials::MailboxCredentials;
use crate::scheduler::TimerId;

/// Lifecycle state of one mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxState {
    /// No session and no operation in flight.
    Idle,
    /// A connect worker is running.
    Connecting,
    /// A session is open and the folder selected.
    Connected,
    /// A check worker owns the session.
    Checking,
    /// A logout worker is tearing the session down.
    LoggingOut,
    /// Login rejected; waiting for the user to decide.
    Disabled,
}

/// What happens once a logout completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum AfterLogout {
    /// Stay disconnected.
    Stay,
    /// Reconnect after the backoff delay.
    Retry,
    /// Reconnect right away.
    Connect,
}

/// Holder of the live session of one mailbox.
///
/// Every logout bumps the generation. A worker only stores a session back
/// if the generation it started with is still current, so a connect or
/// check that raced a logout can never resurrect a session.
#[derive(Debug)]
pub(crate) struct SessionCell<S> {
    generation: AtomicU64,
    session: Mutex<Option<S>>,
}

impl<S> SessionCell<S> {
    pub(crate) fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            session: Mutex::new(None),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Invalidates every session handed out so far.
    pub(crate) fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Stores a session opened or used under `generation`.
    ///
    /// Hands the session back if it went stale in the meantime.
    pub(crate) async fn put(&self, session: S, generation: u64) -> Result<(), S> {
        let mut slot = self.session.lock().await;
        if self.generation() != generation || slot.is_some() {
            return Err(session);
        }
        *slot = Some(session);
        Ok(())
    }

    /// Takes the session out of the cell.
    pub(crate) async fn take(&self) -> Option<S> {
        self.session.lock().await.take()
    }
}

/// Everything the controller tracks for one mailbox.
#[derive(Debug)]
pub(crate) struct MailboxSlot<S> {
    pub(crate) credentials: MailboxCredentials,
    pub(crate) state: MailboxState,
    /// Unread count of the last successful check.
    pub(crate) unread: usize,
    /// Unseen identifiers of the last successful check.
    pub(crate) unseen: BTreeSet<MessageId>,
    pub(crate) session: Arc<SessionCell<S>>,
    pub(crate) connect_task: Option<JoinHandle<()>>,
    pub(crate) check_task: Option<JoinHandle<()>>,
    pub(crate) logout_task: Option<JoinHandle<()>>,
    /// Timeout of the connect or check in flight.
    pub(crate) pending_timeout: Option<TimerId>,
    pub(crate) reconnect_timer: Option<TimerId>,
    /// Identifier of the current connect or check.
    pub(crate) op: u64,
    /// Identifier of the current logout.
    pub(crate) logout_op: u64,
    pub(crate) after_logout: AfterLogout,
    pub(crate) backoff: Backoff,
}

impl<S> MailboxSlot<S> {
    pub(crate) fn new(credentials: MailboxCredentials) -> Self {
        Self {
            credentials,
            state: MailboxState::Idle,
            unread: 0,
            unseen: BTreeSet::new(),
            session: Arc::new(SessionCell::new()),
            connect_task: None,
            check_task: None,
            logout_task: None,
            pending_timeout: None,
            reconnect_timer: None,
            op: 0,
            logout_op: 0,
            after_logout: AfterLogout::Stay,
            backoff: Backoff::default(),
        }
    }

    pub(crate) fn connect_live(&self) -> bool {
        is_live(self.connect_task.as_ref())
    }

    pub(crate) fn check_live(&self) -> bool {
        is_live(self.check_task.as_ref())
    }

    pub(crate) fn logout_live(&self) -> bool {
        is_live(self.logout_task.as_ref())
    }

    /// True while a connect is running or a logout will be followed by one.
    pub(crate) fn is_connecting(&self) -> bool {
        self.connect_live() || (self.logout_live() && self.after_logout == AfterLogout::Connect)
    }

    /// True if a session is open and nothing else is using it.
    pub(crate) fn can_check(&self) -> bool {
        self.state == MailboxState::Connected && !self.connect_live() && !self.check_live()
    }

    /// True if a session may be stored in the cell.
    pub(crate) const fn holds_session(&self) -> bool {
        matches!(self.state, MailboxState::Connected | MailboxState::Checking)
    }

    /// Aborts the connect and check workers, dropping whatever they hold.
    pub(crate) fn abort_operations(&mut self) {
        for task in [self.connect_task.take(), self.check_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

fn is_live(task: Option<&JoinHandle<()>>) -> bool {
    task.is_some_and(|t| !t.is_finished())
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

    #[tokio::test]
    async fn test_put_rejects_stale_generation() {
        let cell = SessionCell::new();
        let generation = cell.generation();

        cell.invalidate();
        assert_eq!(cell.put("old", generation).await, Err("old"));
        assert!(cell.take().await.is_none());

        cell.put("new", cell.generation()).await.unwrap();
        assert_eq!(cell.take().await, Some("new"));
    }

    #[tokio::test]
    async fn test_put_never_overwrites() {
        let cell = SessionCell::new();
        cell.put(1, 0).await.unwrap();
        assert_eq!(cell.put(2, 0).await, Err(2));
        assert_eq!(cell.take().await, Some(1));
    }

    #[tokio::test]
    async fn test_liveness() {
        let creds = MailboxCredentials::new("imap.example.org", "ann", "pw", "INBOX");
        let mut slot: MailboxSlot<()> = MailboxSlot::new(creds);
        assert!(!slot.connect_live());

        slot.connect_task = Some(tokio::spawn(std::future::pending()));
        assert!(slot.connect_live());
        assert!(slot.is_connecting());

        slot.abort_operations();
        assert!(!slot.connect_live());
        assert!(slot.connect_task.is_none());
    }
}
