//! In-memory collaborators for controller tests.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use checkmails_mime::HeaderSummary;

use crate::connection::{MailboxConnector, MailboxSession, MessageId, SessionError};
use crate::credentials::{CredentialResult, CredentialStore, MailboxCredentials};
use crate::notify::NotificationSink;
use crate::probe::ConnectivityProbe;
use crate::prompt::{AuthDecision, AuthPrompt};
use crate::settings::{MailboxList, Settings, SettingsStore};
use crate::tray::{MenuItem, TrayIcon};

/// Scripted server behavior of one mailbox, keyed by login.
#[derive(Debug, Default)]
pub(crate) struct MailboxScript {
    /// Connect results, consumed in order. Succeeds once exhausted.
    pub(crate) connect: VecDeque<Result<(), SessionError>>,
    /// Delays of successive connects. Zero once exhausted.
    pub(crate) connect_delays: VecDeque<Duration>,
    /// Delays of successive searches. Zero once exhausted.
    pub(crate) search_delays: VecDeque<Duration>,
    /// Errors of successive searches. Succeeds once exhausted.
    pub(crate) search_errors: VecDeque<SessionError>,
    pub(crate) unseen: Vec<u32>,
}

#[derive(Debug, Default)]
struct Ledger {
    connects: HashMap<String, usize>,
    searches: HashMap<String, usize>,
    live: usize,
    max_live: usize,
    logouts: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeConnector {
    scripts: Arc<Mutex<HashMap<String, MailboxScript>>>,
    ledger: Arc<Mutex<Ledger>>,
}

impl FakeConnector {
    pub(crate) fn script(&self, login: &str, edit: impl FnOnce(&mut MailboxScript)) {
        edit(self.scripts.lock().unwrap().entry(login.to_string()).or_default());
    }

    pub(crate) fn connects(&self, login: &str) -> usize {
        self.ledger.lock().unwrap().connects.get(login).copied().unwrap_or(0)
    }

    pub(crate) fn searches(&self, login: &str) -> usize {
        self.ledger.lock().unwrap().searches.get(login).copied().unwrap_or(0)
    }

    pub(crate) fn live_sessions(&self) -> usize {
        self.ledger.lock().unwrap().live
    }

    pub(crate) fn max_live_sessions(&self) -> usize {
        self.ledger.lock().unwrap().max_live
    }

    pub(crate) fn logouts(&self) -> usize {
        self.ledger.lock().unwrap().logouts
    }
}

impl MailboxConnector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, credentials: &MailboxCredentials) -> Result<FakeSession, SessionError> {
        let login = credentials.login.clone();
        let (delay, result) = {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.entry(login.clone()).or_default();
            (
                script.connect_delays.pop_front().unwrap_or_default(),
                script.connect.pop_front(),
            )
        };
        *self
            .ledger
            .lock()
            .unwrap()
            .connects
            .entry(login.clone())
            .or_default() += 1;

        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
        result.unwrap_or(Ok(()))?;
        Ok(FakeSession::open(login, self.clone()))
    }
}

/// Session counting itself in the connector's ledger while alive.
#[derive(Debug)]
pub(crate) struct FakeSession {
    login: String,
    connector: FakeConnector,
}

impl FakeSession {
    fn open(login: String, connector: FakeConnector) -> Self {
        {
            let mut ledger = connector.ledger.lock().unwrap();
            ledger.live += 1;
            ledger.max_live = ledger.max_live.max(ledger.live);
        }
        Self { login, connector }
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        if let Ok(mut ledger) = self.connector.ledger.lock() {
            ledger.live -= 1;
        }
    }
}

impl MailboxSession for FakeSession {
    async fn search_unseen(&mut self) -> Result<BTreeSet<MessageId>, SessionError> {
        let (delay, error, unseen) = {
            let mut scripts = self.connector.scripts.lock().unwrap();
            let script = scripts.entry(self.login.clone()).or_default();
            (
                script.search_delays.pop_front().unwrap_or_default(),
                script.search_errors.pop_front(),
                script.unseen.clone(),
            )
        };
        *self
            .connector
            .ledger
            .lock()
            .unwrap()
            .searches
            .entry(self.login.clone())
            .or_default() += 1;

        tokio::time::sleep(delay).await;
        match error {
            Some(e) => Err(e),
            None => Ok(unseen.into_iter().map(MessageId).collect()),
        }
    }

    async fn fetch_header(&mut self, id: MessageId) -> Result<Option<HeaderSummary>, SessionError> {
        Ok(Some(HeaderSummary {
            subject: format!("Message {id}"),
            from: "alice@example.org".to_string(),
            date: "Mon 02 Jun 2025, 10:00".to_string(),
        }))
    }

    async fn logout(self) {
        self.connector.ledger.lock().unwrap().logouts += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeProbe {
    online: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub(crate) fn new(online: bool) -> Self {
        let probe = Self::default();
        probe.set_online(online);
        probe
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConnectivityProbe for FakeProbe {
    async fn is_online(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.online.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SinkEvent {
    Notify { title: String, body: String },
    Badge(usize),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn bodies(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Notify { body, .. } => Some(body),
                SinkEvent::Badge(_) => None,
            })
            .collect()
    }

    pub(crate) fn count(&self, body: &str) -> usize {
        self.bodies().iter().filter(|b| *b == body).count()
    }

    pub(crate) fn last_badge(&self) -> Option<usize> {
        self.events().into_iter().rev().find_map(|event| match event {
            SinkEvent::Badge(count) => Some(count),
            SinkEvent::Notify { .. } => None,
        })
    }

    pub(crate) fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, title: &str, body: &str) {
        self.events.lock().unwrap().push(SinkEvent::Notify {
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    fn set_badge_count(&self, count: usize) {
        self.events.lock().unwrap().push(SinkEvent::Badge(count));
    }
}

#[derive(Debug, Default)]
pub(crate) struct TrayState {
    pub(crate) items: Vec<MenuItem>,
    pub(crate) labels: HashMap<MenuItem, String>,
    pub(crate) disabled: HashSet<MenuItem>,
    pub(crate) tooltip: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingTray {
    state: Arc<Mutex<TrayState>>,
}

impl RecordingTray {
    pub(crate) fn with<R>(&self, read: impl FnOnce(&TrayState) -> R) -> R {
        read(&self.state.lock().unwrap())
    }
}

impl TrayIcon for RecordingTray {
    fn add_menu_item(&mut self, item: MenuItem) {
        self.state.lock().unwrap().items.push(item);
    }

    fn set_item_label(&mut self, item: MenuItem, label: &str) {
        self.state.lock().unwrap().labels.insert(item, label.to_string());
    }

    fn set_item_enabled(&mut self, item: MenuItem, enabled: bool) {
        let mut state = self.state.lock().unwrap();
        if enabled {
            state.disabled.remove(&item);
        } else {
            state.disabled.insert(item);
        }
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        self.state.lock().unwrap().tooltip = tooltip.to_string();
    }
}

/// Answers login failures from a queue; deactivates once it runs dry.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedPrompt {
    answers: Arc<Mutex<VecDeque<AuthDecision>>>,
    asked: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompt {
    pub(crate) fn answer(&self, decision: AuthDecision) {
        self.answers.lock().unwrap().push_back(decision);
    }

    pub(crate) fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl AuthPrompt for ScriptedPrompt {
    async fn resolve(&self, mailbox: &str, _current: &MailboxCredentials) -> AuthDecision {
        self.asked.lock().unwrap().push(mailbox.to_string());
        let answer = self.answers.lock().unwrap().pop_front();
        answer.unwrap_or(AuthDecision::Deactivate)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MemorySettingsStore {
    settings: Arc<Mutex<Settings>>,
}

impl MemorySettingsStore {
    pub(crate) fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(Mutex::new(settings)),
        }
    }

    pub(crate) fn get(&self) -> Settings {
        self.settings.lock().unwrap().clone()
    }

    pub(crate) fn set(&self, settings: Settings) {
        *self.settings.lock().unwrap() = settings;
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> crate::Result<Settings> {
        Ok(self.get())
    }

    fn save(&self, settings: &Settings) -> crate::Result<()> {
        self.set(settings.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryCredentialStore {
    entries: Arc<Mutex<HashMap<String, MailboxCredentials>>>,
}

impl MemoryCredentialStore {
    pub(crate) fn get(&self, mailbox: &str) -> Option<MailboxCredentials> {
        self.entries.lock().unwrap().get(mailbox).cloned()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, mailbox: &str) -> CredentialResult<Option<MailboxCredentials>> {
        Ok(self.get(mailbox))
    }

    fn save(&self, mailbox: &str, credentials: &MailboxCredentials) -> CredentialResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(mailbox.to_string(), credentials.clone());
        Ok(())
    }

    fn delete(&self, mailbox: &str) -> CredentialResult<()> {
        self.entries.lock().unwrap().remove(mailbox);
        Ok(())
    }
}

/// Credentials whose login is the mailbox name, so scripts key on it.
pub(crate) fn credentials_for(name: &str) -> MailboxCredentials {
    MailboxCredentials::new(format!("imap.{name}.example"), name, "secret", "INBOX")
}

/// Settings with the given active mailboxes and default timings.
pub(crate) fn settings_with(active: &[&str]) -> Settings {
    Settings {
        active: MailboxList::parse(&active.join(",")),
        ..Settings::default()
    }
}
