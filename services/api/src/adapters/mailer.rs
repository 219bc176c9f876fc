//! services/api/src/adapters/mailer.rs
//!
//! A `MailService` that writes outgoing mail to the log instead of delivering it.
//! Sent messages are also kept in memory so they can be inspected.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;
use workflow_core::ports::{MailService, OutgoingMail, PortResult};

pub struct LogMailer {
    from: String,
    outbox: Mutex<Vec<OutgoingMail>>,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Everything sent so far, oldest first.
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl MailService for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> PortResult<()> {
        info!(
            from = %self.from,
            to = %mail.to,
            subject = %mail.subject,
            "Outgoing mail:\n{}",
            mail.html_body
        );
        self.outbox.lock().await.push(mail);
        Ok(())
    }
}
