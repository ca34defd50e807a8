//! Mailbox lifecycle controller.
//!
//! One event loop owns every mailbox slot and every timer. Connects, checks,
//! logouts and connectivity probes run on spawned tasks that report back
//! through a channel; the loop never waits on the network itself.
//!
//! A cycle goes through three phases:
//!
//! 1. connect every active mailbox, then poll every [`BARRIER_INTERVAL`]
//!    until no connect is running and resolve queued login failures;
//! 2. launch one check per connected mailbox;
//! 3. poll every [`BARRIER_INTERVAL`] until those checks are done, then
//!    notify the summary and update the badge.
//!
//! The next check is armed after the configured interval.

mod cycle;
mod lifecycle;
mod phases;
mod slot;
mod worker;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, VecDeque};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub use self::cycle::{
    CHECKING, ERROR_TITLE, NO_ACTIVE_MAILBOX, NO_INTERNET, NO_UNREAD, SUSPENDED, UNREAD_TITLE,
    newly_arrived,
};
use self::cycle::Cycle;
use self::slot::{AfterLogout, MailboxSlot, MailboxState};
use self::worker::{ProbePurpose, Reports, WorkerReport};
use crate::connection::MailboxConnector;
use crate::credentials::CredentialStore;
use crate::notify::NotificationSink;
use crate::probe::ConnectivityProbe;
use crate::prompt::AuthPrompt;
use crate::scheduler::{Fired, Scheduler, TimerId};
use crate::settings::{Settings, SettingsStore};
use crate::tray::{MenuItem, TrayIcon};

/// Polling interval of the connect and check barriers.
///
/// Independent of the operation timeout.
pub const BARRIER_INTERVAL: Duration = Duration::from_secs(20);

/// Time granted to logouts when quitting.
pub const QUIT_GRACE: Duration = Duration::from_secs(5);

/// Tray menu actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Check right now and always notify the result.
    CheckNow,
    /// Log out of every mailbox and connect again.
    Reconnect,
    /// Suspend the checks, or restart them when suspended.
    ToggleSuspend,
    /// Notify the last summary.
    ShowDetails,
    /// Reread settings and credentials and start over.
    Reload,
    /// Log out of every mailbox and stop the controller.
    Quit,
}

/// Cloneable sender of [`ControlCommand`]s.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlCommand>,
}

impl ControlHandle {
    /// Sends a command. Returns false once the controller has stopped.
    pub fn send(&self, command: ControlCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    /// Sends [`ControlCommand::CheckNow`].
    pub fn check_now(&self) -> bool {
        self.send(ControlCommand::CheckNow)
    }

    /// Sends [`ControlCommand::Reconnect`].
    pub fn reconnect(&self) -> bool {
        self.send(ControlCommand::Reconnect)
    }

    /// Sends [`ControlCommand::Quit`].
    pub fn quit(&self) -> bool {
        self.send(ControlCommand::Quit)
    }
}

/// External services the controller drives.
pub struct Collaborators<C, P, A> {
    /// Opens mailbox sessions.
    pub connector: C,
    /// Tells whether the Internet is reachable.
    pub probe: P,
    /// Resolves rejected logins.
    pub prompt: A,
    /// Desktop notifications and badge.
    pub sink: Box<dyn NotificationSink>,
    /// Tray menu.
    pub tray: Box<dyn TrayIcon>,
    /// Settings persistence.
    pub settings: Box<dyn SettingsStore>,
    /// Mailbox credentials.
    pub credentials: Box<dyn CredentialStore>,
}

/// Timer payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TimerEvent {
    /// Connect barrier.
    LaunchCheck { force_notify: bool },
    /// Check barrier.
    NotifyUnread { force_notify: bool },
    /// Next periodic check.
    Recheck,
    /// Connectivity poll while offline.
    TestConnection,
    OperationTimeout { mailbox: String, op: u64 },
    Reconnect { mailbox: String },
}

/// The four top-level timers.
#[derive(Debug, Default)]
struct CycleTimers {
    launch: Option<TimerId>,
    notify: Option<TimerId>,
    recheck: Option<TimerId>,
    connectivity: Option<TimerId>,
}

/// The mailbox lifecycle controller.
pub struct Controller<C: MailboxConnector, P, A> {
    connector: Arc<C>,
    probe: Arc<P>,
    prompt: A,
    sink: Box<dyn NotificationSink>,
    tray: Box<dyn TrayIcon>,
    settings_store: Box<dyn SettingsStore>,
    credentials: Box<dyn CredentialStore>,
    settings: Settings,
    slots: BTreeMap<String, MailboxSlot<C::Session>>,
    scheduler: Scheduler<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<Fired<TimerEvent>>,
    reports: Reports,
    report_rx: mpsc::UnboundedReceiver<WorkerReport>,
    commands: mpsc::UnboundedReceiver<ControlCommand>,
    timers: CycleTimers,
    /// Mailboxes whose login was rejected, in failure order.
    auth_failures: VecDeque<String>,
    cycle: Option<Cycle>,
    last_summary: Option<String>,
    /// Set once "no Internet" was notified, until connectivity returns.
    offline_notified: bool,
    suspended: bool,
    next_op: u64,
}

impl<C, P, A> Controller<C, P, A>
where
    C: MailboxConnector,
    P: ConnectivityProbe,
    A: AuthPrompt,
{
    /// Creates a controller and the handle used to drive it.
    pub fn new(collaborators: Collaborators<C, P, A>) -> (Self, ControlHandle) {
        let (scheduler, timer_rx) = Scheduler::new();
        let (reports, report_rx) = mpsc::unbounded_channel();
        let (tx, commands) = mpsc::unbounded_channel();

        let controller = Self {
            connector: Arc::new(collaborators.connector),
            probe: Arc::new(collaborators.probe),
            prompt: collaborators.prompt,
            sink: collaborators.sink,
            tray: collaborators.tray,
            settings_store: collaborators.settings,
            credentials: collaborators.credentials,
            settings: Settings::default(),
            slots: BTreeMap::new(),
            scheduler,
            timer_rx,
            reports,
            report_rx,
            commands,
            timers: CycleTimers::default(),
            auth_failures: VecDeque::new(),
            cycle: None,
            last_summary: None,
            offline_notified: false,
            suspended: false,
            next_op: 0,
        };

        (controller, ControlHandle { tx })
    }

    /// Runs until [`ControlCommand::Quit`] or until every handle is dropped.
    pub async fn run(mut self) {
        info!("starting checkmails");
        self.start();

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if self.handle_command(command).is_break() {
                        break;
                    }
                }
                Some(report) = self.report_rx.recv() => self.handle_report(report),
                Some(fired) = self.timer_rx.recv() => {
                    if self.scheduler.accept(fired.id) {
                        self.handle_timer(fired.event).await;
                    }
                }
            }
        }

        self.shutdown().await;
    }

    fn start(&mut self) {
        for item in MenuItem::ALL {
            self.tray.add_menu_item(item);
        }
        self.tray.set_tooltip("checkmails");
        self.load_mailboxes();
    }

    fn handle_command(&mut self, command: ControlCommand) -> ControlFlow<()> {
        debug!(?command, "menu command");
        match command {
            ControlCommand::CheckNow if self.suspended => debug!("check ignored while suspended"),
            ControlCommand::CheckNow => self.check_mails(true),
            ControlCommand::Reconnect if self.suspended => {
                debug!("reconnect ignored while suspended");
            }
            ControlCommand::Reconnect => self.reconnect(),
            ControlCommand::ToggleSuspend if self.suspended => self.resume(),
            ControlCommand::ToggleSuspend => self.suspend(),
            ControlCommand::ShowDetails => self.show_details(),
            ControlCommand::Reload => self.reset(),
            ControlCommand::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    async fn handle_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::LaunchCheck { force_notify } => {
                self.timers.launch = None;
                self.launch_check(force_notify).await;
            }
            TimerEvent::NotifyUnread { force_notify } => {
                self.timers.notify = None;
                self.notify_unread(force_notify);
            }
            TimerEvent::Recheck => {
                self.timers.recheck = None;
                self.check_mails(false);
            }
            TimerEvent::TestConnection => {
                self.timers.connectivity = None;
                self.spawn_probe(ProbePurpose::Connectivity);
            }
            TimerEvent::OperationTimeout { mailbox, op } => self.on_operation_timeout(&mailbox, op),
            TimerEvent::Reconnect { mailbox } => {
                if let Some(slot) = self.slots.get_mut(&mailbox) {
                    slot.reconnect_timer = None;
                }
                if !self.suspended {
                    self.start_connect(&mailbox);
                }
            }
        }
    }

    /// Forced logout and immediate reconnect of every mailbox.
    fn reconnect(&mut self) {
        self.offline_notified = false;
        if self.slots.is_empty() {
            self.load_mailboxes();
            return;
        }

        info!("reconnecting every mailbox");
        self.scheduler.cancel_slot(&mut self.timers.launch);
        for slot in self.slots.values_mut() {
            slot.unread = 0;
            slot.backoff.reset();
        }
        let names: Vec<String> = self.slots.keys().cloned().collect();
        for name in &names {
            self.request_logout(name, true, AfterLogout::Connect);
        }
        self.arm_launch(false);
    }

    fn suspend(&mut self) {
        self.cancel_cycle_timers();
        for slot in self.slots.values_mut() {
            self.scheduler.cancel_slot(&mut slot.reconnect_timer);
        }
        self.suspended = true;

        self.tray.set_item_label(MenuItem::Suspend, "Restart");
        self.tray.set_item_enabled(MenuItem::Check, false);
        self.tray.set_item_enabled(MenuItem::Reconnect, false);
        self.tray.set_tooltip("checkmails suspended");
        info!("checks suspended");
    }

    fn resume(&mut self) {
        self.suspended = false;
        self.tray.set_item_label(MenuItem::Suspend, MenuItem::Suspend.label());
        self.tray.set_item_enabled(MenuItem::Check, true);
        self.tray.set_item_enabled(MenuItem::Reconnect, true);
        self.reconnect();
        info!("checks restarted");
    }

    fn show_details(&self) {
        let body = if self.suspended {
            SUSPENDED
        } else {
            self.last_summary.as_deref().unwrap_or(CHECKING)
        };
        self.sink.notify(UNREAD_TITLE, body);
    }

    /// Logs out of everything, rereads the configuration and reconnects.
    fn reset(&mut self) {
        info!("resetting every connection");
        self.cancel_cycle_timers();
        self.cycle = None;
        for slot in self.slots.values_mut() {
            slot.unread = 0;
        }
        self.load_mailboxes();
    }

    /// Syncs the slots with the settings and credential stores, then
    /// connects every active mailbox unless suspended.
    fn load_mailboxes(&mut self) {
        match self.settings_store.load() {
            Ok(mut settings) => {
                settings.normalize();
                self.settings = settings;
            }
            Err(e) => error!(error = %e, "cannot load settings, keeping the current ones"),
        }

        let mut wanted = BTreeMap::new();
        let mut unknown = Vec::new();
        for name in self.settings.active.iter() {
            match self.credentials.load(name) {
                Ok(Some(credentials)) => {
                    wanted.insert(name.to_string(), credentials);
                }
                Ok(None) => unknown.push(name.to_string()),
                Err(e) => error!(mailbox = %name, error = %e, "cannot read credentials"),
            }
        }

        if !unknown.is_empty() {
            for name in &unknown {
                warn!(mailbox = %name, "no credentials, removing mailbox");
                self.settings.forget(name);
            }
            self.persist_settings();
            self.sink.notify(
                ERROR_TITLE,
                &format!("No credentials for {}, removed from the mailbox list.", unknown.join(", ")),
            );
        }

        let retired: Vec<String> = self
            .slots
            .keys()
            .filter(|name| !wanted.contains_key(*name))
            .cloned()
            .collect();
        for name in &retired {
            self.retire(name);
        }

        if wanted.is_empty() {
            self.last_summary = Some(NO_ACTIVE_MAILBOX.to_string());
            self.sink.notify(
                NO_ACTIVE_MAILBOX,
                "Use `checkmails add` to configure a mailbox.",
            );
            return;
        }

        for (name, credentials) in wanted {
            if let Some(slot) = self.slots.get_mut(&name) {
                slot.credentials = credentials;
            } else {
                self.slots.insert(name, MailboxSlot::new(credentials));
            }
        }

        if self.suspended {
            return;
        }

        self.last_summary = None;
        let names: Vec<String> = self.slots.keys().cloned().collect();
        for name in &names {
            let busy = self
                .slots
                .get(name)
                .is_some_and(|slot| !matches!(slot.state, MailboxState::Idle | MailboxState::Disabled));
            if busy {
                self.request_logout(name, true, AfterLogout::Connect);
            } else {
                self.start_connect(name);
            }
        }
        self.arm_launch(false);
    }

    /// Drops a mailbox from the controller, logging out in the background.
    fn retire(&mut self, name: &str) {
        let Some(mut slot) = self.slots.remove(name) else {
            return;
        };

        self.scheduler.cancel_slot(&mut slot.pending_timeout);
        self.scheduler.cancel_slot(&mut slot.reconnect_timer);
        slot.abort_operations();
        slot.session.invalidate();
        self.auth_failures.retain(|n| n != name);

        self.next_op += 1;
        tokio::spawn(worker::logout(
            name.to_string(),
            self.next_op,
            Arc::clone(&slot.session),
            self.reports.clone(),
        ));
        info!(mailbox = %name, "mailbox removed from checks");
    }

    fn persist_settings(&self) {
        if let Err(e) = self.settings_store.save(&self.settings) {
            error!(error = %e, "cannot save settings");
        }
    }

    fn arm_launch(&mut self, force_notify: bool) {
        self.scheduler.cancel_slot(&mut self.timers.launch);
        self.timers.launch = Some(
            self.scheduler
                .after(BARRIER_INTERVAL, TimerEvent::LaunchCheck { force_notify }),
        );
    }

    fn cancel_cycle_timers(&mut self) {
        self.scheduler.cancel_slot(&mut self.timers.launch);
        self.scheduler.cancel_slot(&mut self.timers.notify);
        self.scheduler.cancel_slot(&mut self.timers.recheck);
        self.scheduler.cancel_slot(&mut self.timers.connectivity);
    }

    fn update_badge(&mut self, total: usize) {
        self.sink.set_badge_count(total);
        self.tray.set_tooltip(&format!("checkmails {total}"));
    }

    async fn shutdown(&mut self) {
        info!("logging out of every mailbox");
        self.scheduler.cancel_all();

        let names: Vec<String> = self.slots.keys().cloned().collect();
        for name in &names {
            self.request_logout(name, true, AfterLogout::Stay);
        }

        let deadline = Instant::now() + QUIT_GRACE;
        for (name, slot) in &mut self.slots {
            if let Some(task) = slot.logout_task.take()
                && tokio::time::timeout_at(deadline, task).await.is_err()
            {
                warn!(mailbox = %name, "logout still running at exit");
            }
        }
        info!("checkmails stopped");
    }
}
