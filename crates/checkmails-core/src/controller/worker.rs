//! Tasks spawned per mailbox and per operation.
//!
//! Workers never touch controller state. They move the session in and out
//! of its [`SessionCell`] and report back through the controller's channel.

use std::collections::BTreeSet;
use std::sync::Arc;

use checkmails_mime::HeaderSummary;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::cycle::newly_arrived;
use super::slot::SessionCell;
use crate::connection::{MailboxConnector, MailboxSession, MessageId, SessionError};
use crate::credentials::MailboxCredentials;
use crate::probe::ConnectivityProbe;

/// Result of a connect worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConnectOutcome {
    Connected,
    /// A logout invalidated the attempt; the new session was closed again.
    Superseded,
    AuthFailed(String),
    /// DNS failed while the Internet is reachable.
    MisconfiguredServer,
    /// DNS failed and the Internet is unreachable.
    Offline,
    Transient(String),
    Unexpected(String),
}

/// Result of a check worker.
#[derive(Debug)]
pub(crate) enum CheckOutcome {
    Done {
        unseen: BTreeSet<MessageId>,
        /// Headers of the messages that were not unseen on the last check.
        arrivals: Vec<HeaderSummary>,
    },
    /// The session was gone before the check started.
    NoSession,
    Failed(SessionError),
}

/// Why a connectivity probe was run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProbePurpose {
    /// Periodic poll while offline.
    Connectivity,
    /// A connect or check of `mailbox` exceeded the timeout.
    Timeout { mailbox: String, op: u64 },
}

/// Message from a worker to the controller.
#[derive(Debug)]
pub(crate) enum WorkerReport {
    Connect {
        mailbox: String,
        op: u64,
        outcome: ConnectOutcome,
    },
    Check {
        mailbox: String,
        op: u64,
        outcome: CheckOutcome,
    },
    Logout {
        mailbox: String,
        op: u64,
    },
    Probe {
        purpose: ProbePurpose,
        online: bool,
    },
}

pub(crate) type Reports = mpsc::UnboundedSender<WorkerReport>;

/// Opens a session and stores it in the cell.
pub(crate) struct ConnectJob<C: MailboxConnector, P> {
    pub(crate) mailbox: String,
    pub(crate) op: u64,
    pub(crate) generation: u64,
    pub(crate) credentials: MailboxCredentials,
    pub(crate) connector: Arc<C>,
    pub(crate) probe: Arc<P>,
    pub(crate) cell: Arc<SessionCell<C::Session>>,
    pub(crate) reports: Reports,
}

impl<C: MailboxConnector, P: ConnectivityProbe> ConnectJob<C, P> {
    pub(crate) async fn run(self) {
        info!(mailbox = %self.mailbox, "connecting");

        let outcome = match self.connector.connect(&self.credentials).await {
            Ok(session) => match self.cell.put(session, self.generation).await {
                Ok(()) => ConnectOutcome::Connected,
                Err(stale) => {
                    debug!(mailbox = %self.mailbox, "connect superseded by a logout");
                    stale.logout().await;
                    ConnectOutcome::Superseded
                }
            },
            Err(SessionError::Auth(message)) => ConnectOutcome::AuthFailed(message),
            Err(SessionError::Resolve(message)) => {
                debug!(mailbox = %self.mailbox, %message, "resolution failed, probing connectivity");
                if self.probe.is_online().await {
                    ConnectOutcome::MisconfiguredServer
                } else {
                    ConnectOutcome::Offline
                }
            }
            Err(SessionError::Transient(message)) => ConnectOutcome::Transient(message),
            Err(SessionError::Unexpected(message)) => ConnectOutcome::Unexpected(message),
        };

        let _ = self.reports.send(WorkerReport::Connect {
            mailbox: self.mailbox,
            op: self.op,
            outcome,
        });
    }
}

/// Searches the unseen messages and fetches the headers of new ones.
pub(crate) struct CheckJob<S> {
    pub(crate) mailbox: String,
    pub(crate) op: u64,
    pub(crate) generation: u64,
    pub(crate) previous: BTreeSet<MessageId>,
    pub(crate) fetch_arrivals: bool,
    pub(crate) cell: Arc<SessionCell<S>>,
    pub(crate) reports: Reports,
}

impl<S: MailboxSession> CheckJob<S> {
    pub(crate) async fn run(self) {
        let outcome = match self.cell.take().await {
            None => CheckOutcome::NoSession,
            Some(mut session) => {
                info!(mailbox = %self.mailbox, "collecting unread mails");
                match self.check(&mut session).await {
                    Ok((unseen, arrivals)) => {
                        if let Err(stale) = self.cell.put(session, self.generation).await {
                            debug!(mailbox = %self.mailbox, "session invalidated during check");
                            stale.logout().await;
                        }
                        CheckOutcome::Done { unseen, arrivals }
                    }
                    Err(e) => CheckOutcome::Failed(e),
                }
            }
        };

        let _ = self.reports.send(WorkerReport::Check {
            mailbox: self.mailbox,
            op: self.op,
            outcome,
        });
    }

    async fn check(
        &self,
        session: &mut S,
    ) -> Result<(BTreeSet<MessageId>, Vec<HeaderSummary>), SessionError> {
        let unseen = session.search_unseen().await?;

        let mut arrivals = Vec::new();
        if self.fetch_arrivals {
            for id in newly_arrived(&self.previous, &unseen) {
                match session.fetch_header(id).await? {
                    Some(header) => arrivals.push(header),
                    None => warn!(mailbox = %self.mailbox, %id, "message vanished before fetch"),
                }
            }
        }

        Ok((unseen, arrivals))
    }
}

/// Logs out of whatever session the cell holds.
pub(crate) async fn logout<S: MailboxSession>(
    mailbox: String,
    op: u64,
    cell: Arc<SessionCell<S>>,
    reports: Reports,
) {
    if let Some(session) = cell.take().await {
        info!(%mailbox, "logging out");
        session.logout().await;
        info!(%mailbox, "logged out");
    }
    let _ = reports.send(WorkerReport::Logout { mailbox, op });
}

/// Runs the connectivity probe.
pub(crate) async fn probe<P: ConnectivityProbe>(
    probe: Arc<P>,
    purpose: ProbePurpose,
    reports: Reports,
) {
    let online = probe.is_online().await;
    let _ = reports.send(WorkerReport::Probe { purpose, online });
}
