// SPDX-License-Identifier: Apache-2.0

//! Validated email messages.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::NotifyError;

/// Message recipients; at least one direct recipient is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients {
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
}

impl Recipients {
    /// Creates recipients, dropping blank addresses.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidMessage`] when `to` has no address or an
    /// address contains a line break.
    pub fn new(to: Vec<String>, cc: Vec<String>, bcc: Vec<String>) -> Result<Self, NotifyError> {
        let to = without_blanks(to);
        if to.is_empty() {
            return Err(NotifyError::InvalidMessage {
                reason: "direct recipient is missing (to)",
            });
        }
        let cc = without_blanks(cc);
        let bcc = without_blanks(bcc);
        if to.iter().chain(&cc).chain(&bcc).any(|a| has_line_break(a)) {
            return Err(NotifyError::InvalidMessage {
                reason: "email header contains a line break",
            });
        }
        Ok(Self { to, cc, bcc })
    }

    /// Direct recipients.
    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// Carbon-copy recipients.
    #[must_use]
    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    /// Blind carbon-copy recipients.
    #[must_use]
    pub fn bcc(&self) -> &[String] {
        &self.bcc
    }
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

fn without_blanks(addresses: Vec<String>) -> Vec<String> {
    addresses
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

/// Complete HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    sender: String,
    recipients: Recipients,
    subject: String,
    html_content: String,
}

impl EmailMessage {
    /// Creates a message, rejecting missing parts.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidMessage`] for an empty sender, subject
    /// or content, or a header value containing a line break.
    pub fn new(
        sender: impl Into<String>,
        recipients: Recipients,
        subject: impl Into<String>,
        html_content: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let sender = sender.into();
        let subject = subject.into();
        let html_content = html_content.into();

        if sender.trim().is_empty() {
            return Err(NotifyError::InvalidMessage {
                reason: "email sender is missing",
            });
        }
        if subject.trim().is_empty() {
            return Err(NotifyError::InvalidMessage {
                reason: "email subject is missing",
            });
        }
        if html_content.trim().is_empty() {
            return Err(NotifyError::InvalidMessage {
                reason: "email content is missing",
            });
        }

        if has_line_break(&sender) || has_line_break(&subject) {
            return Err(NotifyError::InvalidMessage {
                reason: "email header contains a line break",
            });
        }

        Ok(Self {
            sender,
            recipients,
            subject,
            html_content,
        })
    }

    /// Sender address.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Recipients.
    #[must_use]
    pub fn recipients(&self) -> &Recipients {
        &self.recipients
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// HTML body.
    #[must_use]
    pub fn html_content(&self) -> &str {
        &self.html_content
    }

    /// Formats the message as RFC 5322 text with a base64 HTML body.
    ///
    /// Lists are joined with `", "`; empty `Cc`/`Bcc` headers are omitted.
    /// A non-ASCII subject is encoded as an RFC 2047 encoded word.
    #[must_use]
    pub fn to_mime(&self) -> String {
        let mut headers = vec![
            format!("From: {}", self.sender),
            format!("To: {}", self.recipients.to.join(", ")),
        ];
        if !self.recipients.cc.is_empty() {
            headers.push(format!("Cc: {}", self.recipients.cc.join(", ")));
        }
        if !self.recipients.bcc.is_empty() {
            headers.push(format!("Bcc: {}", self.recipients.bcc.join(", ")));
        }
        headers.push(format!("Subject: {}", encode_header(&self.subject)));
        headers.push("MIME-Version: 1.0".to_string());
        headers.push("Content-Type: text/html; charset=\"UTF-8\"".to_string());
        headers.push("Content-Transfer-Encoding: base64".to_string());

        let body = STANDARD.encode(self.html_content.as_bytes());
        let lines: Vec<&str> = body
            .as_bytes()
            .chunks(76)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .collect();

        format!("{}\r\n\r\n{}\r\n", headers.join("\r\n"), lines.join("\r\n"))
    }
}

fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }
    format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
}
