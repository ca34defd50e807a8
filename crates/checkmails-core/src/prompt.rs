//! Interactive resolution of authentication failures.

use std::future::Future;

use crate::credentials::MailboxCredentials;

/// What the user wants to do with a mailbox whose login was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Stop checking the mailbox.
    Deactivate,
    /// Retry with corrected credentials.
    Correct(MailboxCredentials),
}

/// Asks the user how to handle a rejected login.
pub trait AuthPrompt: Send + Sync + 'static {
    /// Resolves one failure. The check phase waits for the answer.
    fn resolve(
        &self,
        mailbox: &str,
        current: &MailboxCredentials,
    ) -> impl Future<Output = AuthDecision> + Send;
}
