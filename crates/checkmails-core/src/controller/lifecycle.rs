//! Per-mailbox transitions: connect, check, logout, timeouts and the
//! reports workers send back.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::cycle::{Cycle, ERROR_TITLE, NO_INTERNET, UNREAD_TITLE, message_notification};
use super::slot::{AfterLogout, MailboxState};
use super::worker::{
    self, CheckJob, CheckOutcome, ConnectJob, ConnectOutcome, ProbePurpose, WorkerReport,
};
use super::{Controller, TimerEvent};
use crate::connection::MailboxConnector;
use crate::probe::ConnectivityProbe;
use crate::prompt::AuthPrompt;

impl<C, P, A> Controller<C, P, A>
where
    C: MailboxConnector,
    P: ConnectivityProbe,
    A: AuthPrompt,
{
    /// Starts connecting `name`.
    ///
    /// Does nothing while a connect is already running. A mailbox that holds
    /// a session, or is logging out, connects once the logout completes.
    pub(super) fn start_connect(&mut self, name: &str) {
        let Some(slot) = self.slots.get_mut(name) else {
            return;
        };
        if slot.connect_live() {
            debug!(mailbox = %name, "connect already running");
            return;
        }
        if slot.logout_live() {
            slot.after_logout = AfterLogout::Connect;
            return;
        }
        if slot.holds_session() {
            self.request_logout(name, false, AfterLogout::Connect);
            return;
        }

        self.scheduler.cancel_slot(&mut slot.reconnect_timer);
        self.next_op += 1;
        let op = self.next_op;
        slot.op = op;
        slot.state = MailboxState::Connecting;
        slot.pending_timeout = Some(self.scheduler.after(
            self.settings.operation_timeout(),
            TimerEvent::OperationTimeout {
                mailbox: name.to_string(),
                op,
            },
        ));

        let job = ConnectJob {
            mailbox: name.to_string(),
            op,
            generation: slot.session.generation(),
            credentials: slot.credentials.clone(),
            connector: Arc::clone(&self.connector),
            probe: Arc::clone(&self.probe),
            cell: Arc::clone(&slot.session),
            reports: self.reports.clone(),
        };
        slot.connect_task = Some(tokio::spawn(job.run()));
    }

    /// Logs out of `name`, then does what `then` says.
    ///
    /// A running connect or check is aborted. Without `force`, a logout
    /// already in flight is reused and the follow-up is upgraded.
    pub(super) fn request_logout(&mut self, name: &str, force: bool, then: AfterLogout) {
        let Some(slot) = self.slots.get_mut(name) else {
            return;
        };

        self.scheduler.cancel_slot(&mut slot.pending_timeout);
        self.scheduler.cancel_slot(&mut slot.reconnect_timer);
        slot.abort_operations();

        if !force && slot.logout_live() {
            slot.after_logout = slot.after_logout.max(then);
            return;
        }
        if let Some(task) = slot.logout_task.take() {
            task.abort();
        }

        slot.session.invalidate();
        self.next_op += 1;
        slot.logout_op = self.next_op;
        slot.after_logout = then;
        slot.state = MailboxState::LoggingOut;
        slot.logout_task = Some(tokio::spawn(worker::logout(
            name.to_string(),
            slot.logout_op,
            Arc::clone(&slot.session),
            self.reports.clone(),
        )));
    }

    /// Launches a check of `name` if it is connected and idle.
    pub(super) fn start_check(&mut self, name: &str) -> bool {
        let timeout = self.settings.operation_timeout();
        let fetch_arrivals = self.settings.notify_new_unread;
        let Some(slot) = self.slots.get_mut(name) else {
            return false;
        };
        if !slot.can_check() {
            return false;
        }

        self.next_op += 1;
        let op = self.next_op;
        slot.op = op;
        slot.state = MailboxState::Checking;
        slot.pending_timeout = Some(self.scheduler.after(
            timeout,
            TimerEvent::OperationTimeout {
                mailbox: name.to_string(),
                op,
            },
        ));

        let job = CheckJob {
            mailbox: name.to_string(),
            op,
            generation: slot.session.generation(),
            previous: slot.unseen.clone(),
            fetch_arrivals,
            cell: Arc::clone(&slot.session),
            reports: self.reports.clone(),
        };
        slot.check_task = Some(tokio::spawn(job.run()));
        true
    }

    /// Applies every report already queued.
    pub(super) fn drain_reports(&mut self) {
        while let Ok(report) = self.report_rx.try_recv() {
            self.handle_report(report);
        }
    }

    pub(super) fn handle_report(&mut self, report: WorkerReport) {
        match report {
            WorkerReport::Connect {
                mailbox,
                op,
                outcome,
            } => self.on_connect(&mailbox, op, outcome),
            WorkerReport::Check {
                mailbox,
                op,
                outcome,
            } => self.on_check(&mailbox, op, outcome),
            WorkerReport::Logout { mailbox, op } => self.on_logout(&mailbox, op),
            WorkerReport::Probe { purpose, online } => self.on_probe(purpose, online),
        }
    }

    fn on_connect(&mut self, name: &str, op: u64, outcome: ConnectOutcome) {
        let Some(slot) = self.slots.get_mut(name) else {
            return;
        };
        if slot.op != op || slot.state != MailboxState::Connecting {
            debug!(mailbox = %name, ?outcome, "ignoring stale connect result");
            return;
        }
        slot.connect_task = None;
        self.scheduler.cancel_slot(&mut slot.pending_timeout);

        match outcome {
            ConnectOutcome::Connected => {
                slot.state = MailboxState::Connected;
                slot.backoff.reset();
                info!(mailbox = %name, "connected");
            }
            ConnectOutcome::Superseded => {
                debug!(mailbox = %name, "connect superseded");
                slot.state = MailboxState::Idle;
            }
            ConnectOutcome::AuthFailed(message) => {
                error!(mailbox = %name, %message, "incorrect login or password");
                slot.state = MailboxState::Disabled;
                if !self.auth_failures.iter().any(|n| n == name) {
                    self.auth_failures.push_back(name.to_string());
                }
            }
            ConnectOutcome::MisconfiguredServer => {
                error!(mailbox = %name, server = %slot.credentials.server, "wrong IMAP server");
                self.sink
                    .notify(ERROR_TITLE, &format!("Wrong IMAP server for {name}."));
                self.retire(name);
                self.settings.deactivate(name);
                self.persist_settings();
            }
            ConnectOutcome::Offline => {
                slot.state = MailboxState::Idle;
                self.connectivity_lost();
            }
            ConnectOutcome::Transient(message) => {
                error!(mailbox = %name, %message, "connection failed");
                self.request_logout(name, false, AfterLogout::Retry);
            }
            ConnectOutcome::Unexpected(message) => {
                error!(mailbox = %name, %message, "unexpected connection error");
                self.sink.notify(ERROR_TITLE, &format!("{name}: {message}"));
                self.request_logout(name, false, AfterLogout::Retry);
            }
        }
    }

    fn on_check(&mut self, name: &str, op: u64, outcome: CheckOutcome) {
        let notify_counts = self.settings.notify_nb_unread;
        let Some(slot) = self.slots.get_mut(name) else {
            return;
        };
        if slot.op != op || slot.state != MailboxState::Checking {
            debug!(mailbox = %name, "ignoring stale check result");
            return;
        }
        slot.check_task = None;
        self.scheduler.cancel_slot(&mut slot.pending_timeout);

        match outcome {
            CheckOutcome::Done { unseen, arrivals } => {
                slot.state = MailboxState::Connected;
                slot.unread = unseen.len();
                slot.unseen = unseen;
                let unread = slot.unread;
                info!(mailbox = %name, unread, "unread mails collected");

                for header in &arrivals {
                    let (title, body) = message_notification(name, header);
                    self.sink.notify(&title, &body);
                }
                if let Some(cycle) = self.cycle.as_mut() {
                    cycle.record(name, unread);
                }
            }
            CheckOutcome::NoSession => {
                warn!(mailbox = %name, "no session to check");
                self.request_logout(name, true, AfterLogout::Retry);
            }
            CheckOutcome::Failed(e) => {
                error!(mailbox = %name, error = %e, "check failed");
                if notify_counts {
                    let body = self.cycle.as_ref().map_or_else(
                        || Cycle::default().summary_with_failure(name),
                        |cycle| cycle.summary_with_failure(name),
                    );
                    self.sink.notify(UNREAD_TITLE, &body);
                }
                let others = self
                    .slots
                    .iter()
                    .filter(|(other, _)| other.as_str() != name)
                    .map(|(_, slot)| slot.unread)
                    .sum();
                self.update_badge(others);
                self.request_logout(name, true, AfterLogout::Retry);
            }
        }
    }

    fn on_logout(&mut self, name: &str, op: u64) {
        let Some(slot) = self.slots.get_mut(name) else {
            return;
        };
        if slot.logout_op != op {
            debug!(mailbox = %name, "ignoring stale logout result");
            return;
        }
        slot.logout_task = None;
        slot.state = MailboxState::Idle;

        match std::mem::replace(&mut slot.after_logout, AfterLogout::Stay) {
            AfterLogout::Stay => {}
            AfterLogout::Retry if self.suspended => {}
            AfterLogout::Retry => {
                let delay = slot.backoff.advance();
                info!(mailbox = %name, ?delay, "reconnecting after delay");
                slot.reconnect_timer = Some(self.scheduler.after(
                    delay,
                    TimerEvent::Reconnect {
                        mailbox: name.to_string(),
                    },
                ));
            }
            AfterLogout::Connect => self.start_connect(name),
        }
    }

    pub(super) fn on_operation_timeout(&mut self, name: &str, op: u64) {
        let Some(slot) = self.slots.get_mut(name) else {
            return;
        };
        if slot.op != op {
            return;
        }
        slot.pending_timeout = None;
        if !matches!(slot.state, MailboxState::Connecting | MailboxState::Checking) {
            return;
        }

        warn!(mailbox = %name, state = ?slot.state, "operation timed out");
        self.spawn_probe(ProbePurpose::Timeout {
            mailbox: name.to_string(),
            op,
        });
    }

    fn on_probe(&mut self, purpose: ProbePurpose, online: bool) {
        match purpose {
            ProbePurpose::Connectivity => {
                if self.suspended {
                    return;
                }
                if online {
                    info!("Internet connection is back");
                    self.offline_notified = false;
                    self.reset();
                } else {
                    debug!("still offline");
                    self.arm_connectivity_poll();
                }
            }
            ProbePurpose::Timeout { mailbox, op } => {
                let Some(slot) = self.slots.get(&mailbox) else {
                    return;
                };
                if slot.op != op
                    || !matches!(slot.state, MailboxState::Connecting | MailboxState::Checking)
                {
                    debug!(%mailbox, "operation finished while probing");
                    return;
                }
                if online {
                    warn!(%mailbox, "timed out, reconnecting");
                    self.request_logout(&mailbox, true, AfterLogout::Retry);
                } else {
                    self.connectivity_lost();
                }
            }
        }
    }

    /// Notifies the loss once, stops every cycle timer and polls until the
    /// Internet is reachable again.
    pub(super) fn connectivity_lost(&mut self) {
        warn!("no Internet connection");
        if !self.offline_notified {
            self.sink.notify(ERROR_TITLE, NO_INTERNET);
            self.offline_notified = true;
        }

        self.cancel_cycle_timers();
        for slot in self.slots.values_mut() {
            self.scheduler.cancel_slot(&mut slot.reconnect_timer);
        }
        self.arm_connectivity_poll();
    }

    fn arm_connectivity_poll(&mut self) {
        self.scheduler.cancel_slot(&mut self.timers.connectivity);
        self.timers.connectivity = Some(
            self.scheduler
                .after(self.settings.operation_timeout(), TimerEvent::TestConnection),
        );
    }

    pub(super) fn spawn_probe(&self, purpose: ProbePurpose) {
        tokio::spawn(worker::probe(
            Arc::clone(&self.probe),
            purpose,
            self.reports.clone(),
        ));
    }
}
