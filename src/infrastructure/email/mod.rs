//! Outgoing Email
//!
//! Transactional messages sent to users. Delivery goes through the
//! [`Mailer`] trait; the bundled [`LogMailer`] renders each message and
//! writes it to the tracing log instead of talking to an SMTP relay.

mod templates;

use async_trait::async_trait;

use crate::config::EmailSettings;

pub use templates::{EmailTemplate, RenderedEmail};

/// Email dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Sends rendered templates to a recipient
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, template: EmailTemplate) -> Result<(), MailError>;
}

/// Send a message without failing the caller.
///
/// Errors are logged and swallowed; a booking or registration never fails
/// because a notification could not be delivered.
pub async fn notify(mailer: &dyn Mailer, to: &str, template: EmailTemplate) {
    let kind = template.kind();
    if let Err(e) = mailer.send(to, template).await {
        tracing::warn!(error = %e, template = kind, "Failed to send email");
    }
}

/// Mailer that logs rendered messages.
pub struct LogMailer {
    settings: EmailSettings,
}

impl LogMailer {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, template: EmailTemplate) -> Result<(), MailError> {
        if !to.contains('@') {
            return Err(MailError::InvalidRecipient(to.to_string()));
        }

        if !self.settings.enabled {
            tracing::debug!(to = %to, template = template.kind(), "Email disabled, skipping");
            return Ok(());
        }

        let email = template.render(&self.settings.frontend_url);
        tracing::info!(
            from = %self.settings.from_address,
            to = %to,
            subject = %email.subject,
            body = %email.body,
            "Email dispatched"
        );

        Ok(())
    }
}

/// Mailer that records every message, for tests.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: parking_lot::Mutex<Vec<(String, EmailTemplate)>>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.sent.lock().iter().map(|(_, t)| t.kind()).collect()
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, template: EmailTemplate) -> Result<(), MailError> {
        self.sent.lock().push((to.to_string(), template));
        Ok(())
    }
}
