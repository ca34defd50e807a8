//! The three phases of a check cycle.

use tracing::{debug, error, info};

use super::cycle::{Cycle, NO_UNREAD, UNREAD_TITLE};
use super::slot::{MailboxSlot, MailboxState};
use super::{BARRIER_INTERVAL, Controller, TimerEvent};
use crate::connection::MailboxConnector;
use crate::probe::ConnectivityProbe;
use crate::prompt::{AuthDecision, AuthPrompt};

impl<C, P, A> Controller<C, P, A>
where
    C: MailboxConnector,
    P: ConnectivityProbe,
    A: AuthPrompt,
{
    /// Connect barrier.
    ///
    /// Waits for every connect to settle, then asks the user about each
    /// rejected login. Any correction restarts the barrier so the corrected
    /// mailbox gets connected before the check.
    pub(super) async fn launch_check(&mut self, force_notify: bool) {
        self.drain_reports();
        if self.slots.values().any(MailboxSlot::is_connecting) {
            debug!("waiting for connections");
            self.arm_launch(force_notify);
            return;
        }

        if self.resolve_auth_failures().await {
            self.arm_launch(force_notify);
            return;
        }

        self.check_mails(force_notify);
    }

    /// Returns true if at least one mailbox got new credentials.
    async fn resolve_auth_failures(&mut self) -> bool {
        let mut corrected = false;

        while let Some(name) = self.auth_failures.pop_front() {
            let Some(current) = self
                .slots
                .get(&name)
                .filter(|slot| slot.state == MailboxState::Disabled)
                .map(|slot| slot.credentials.clone())
            else {
                continue;
            };

            match self.prompt.resolve(&name, &current).await {
                AuthDecision::Deactivate => {
                    info!(mailbox = %name, "mailbox deactivated");
                    self.retire(&name);
                    self.settings.deactivate(&name);
                    self.persist_settings();
                }
                AuthDecision::Correct(credentials) => {
                    info!(mailbox = %name, "credentials corrected");
                    if let Err(e) = self.credentials.save(&name, &credentials) {
                        error!(mailbox = %name, error = %e, "cannot store credentials");
                    }
                    if let Some(slot) = self.slots.get_mut(&name) {
                        slot.credentials = credentials;
                        slot.state = MailboxState::Idle;
                    }
                    self.start_connect(&name);
                    corrected = true;
                }
            }
        }

        corrected
    }

    /// Launches one check per connected mailbox and arms the check barrier
    /// and the next periodic check.
    pub(super) fn check_mails(&mut self, force_notify: bool) {
        self.scheduler.cancel_slot(&mut self.timers.recheck);
        self.scheduler.cancel_slot(&mut self.timers.notify);
        self.drain_reports();

        let names: Vec<String> = self.slots.keys().cloned().collect();
        let launched = names.iter().filter(|name| self.start_check(name)).count();
        info!(mailboxes = launched, "checking mails");
        self.cycle = Some(Cycle::new(force_notify));

        self.timers.notify = Some(
            self.scheduler
                .after(BARRIER_INTERVAL, TimerEvent::NotifyUnread { force_notify }),
        );
        self.timers.recheck = Some(
            self.scheduler
                .after(self.settings.check_interval(), TimerEvent::Recheck),
        );
    }

    /// Check barrier.
    ///
    /// Waits until no check is running, then notifies the summary and
    /// updates the badge. Checks still running from an earlier cycle hold
    /// the barrier too.
    pub(super) fn notify_unread(&mut self, force_notify: bool) {
        self.drain_reports();

        if self.cycle.is_none() {
            return;
        }
        if self.slots.values().any(MailboxSlot::check_live) {
            debug!("waiting for checks");
            self.timers.notify = Some(
                self.scheduler
                    .after(BARRIER_INTERVAL, TimerEvent::NotifyUnread { force_notify }),
            );
            return;
        }

        let Some(cycle) = self.cycle.take() else {
            return;
        };
        let summary = cycle.summary();
        if summary.is_empty() {
            if cycle.force_notify {
                self.sink.notify(UNREAD_TITLE, NO_UNREAD);
            }
            self.last_summary = Some(NO_UNREAD.to_string());
        } else {
            if cycle.force_notify || self.settings.notify_nb_unread {
                self.sink.notify(UNREAD_TITLE, &summary);
            }
            self.last_summary = Some(summary);
        }

        let total = self.slots.values().map(|slot| slot.unread).sum();
        self.update_badge(total);
    }
}
