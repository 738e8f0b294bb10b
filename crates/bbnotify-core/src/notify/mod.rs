// SPDX-License-Identifier: Apache-2.0

//! Email notification of grouped pull requests.
//!
//! - [`message`] - validated recipients and messages
//! - [`template`] - HTML rendering
//! - [`gmail`] - Gmail transport

use std::sync::Arc;

use tracing::{info, instrument};

use crate::bitbucket::GroupedPullRequests;
use crate::config::NotificationConfig;
use crate::error::NotifyError;

pub mod gmail;
pub mod message;
pub mod template;

pub use gmail::{GmailMailer, MailTransport};
pub use message::{EmailMessage, Recipients};
pub use template::{DEFAULT_TEMPLATE, render_html};

/// Who a notification goes to and under which subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Sender address.
    pub sender: String,
    /// Recipients.
    pub recipients: Recipients,
    /// Subject line.
    pub subject: String,
}

impl Envelope {
    /// Builds the envelope from the `notification` section.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidMessage`] when no direct recipient is
    /// configured.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotifyError> {
        Ok(Self {
            sender: config.sender.clone(),
            recipients: Recipients::new(config.to.clone(), config.cc.clone(), config.bcc.clone())?,
            subject: config.subject.clone(),
        })
    }
}

/// A sent notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport message id.
    pub message_id: String,
    /// Rendered HTML body.
    pub html: String,
}

/// Renders grouped pull requests and sends them.
pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    template: Option<String>,
}

impl Notifier {
    /// Creates a notifier using the built-in template.
    #[must_use]
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            transport,
            template: None,
        }
    }

    /// Replaces the built-in template.
    #[must_use]
    pub fn with_template(mut self, template: Option<String>) -> Self {
        self.template = template;
        self
    }

    /// Renders `grouped` into HTML.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] on template failure.
    pub fn render(&self, grouped: &GroupedPullRequests) -> Result<String, NotifyError> {
        render_html(grouped, self.template.as_deref())
    }

    /// Renders and sends `grouped`; sends nothing for an empty result.
    ///
    /// # Errors
    ///
    /// Propagates rendering, message validation and transport failures.
    #[instrument(skip_all, fields(count = grouped.len()))]
    pub async fn notify(
        &self,
        grouped: &GroupedPullRequests,
        envelope: &Envelope,
    ) -> Result<Option<Delivery>, NotifyError> {
        if grouped.is_empty() {
            info!("No pull requests to report, nothing sent");
            return Ok(None);
        }

        let html = self.render(grouped)?;
        let message = EmailMessage::new(
            envelope.sender.clone(),
            envelope.recipients.clone(),
            envelope.subject.clone(),
            html.clone(),
        )?;
        let message_id = self.transport.send(&message).await?;

        Ok(Some(Delivery { message_id, html }))
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("custom_template", &self.template.is_some())
            .finish_non_exhaustive()
    }
}
