//! Sent mail record types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Delivery status of a sent mail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendStatus {
    /// Accepted by the relay.
    #[default]
    Sent,
    /// Rejected by the relay.
    Failed,
    /// Dispatch not yet confirmed.
    Pending,
}

impl SendStatus {
    /// Convert status to its database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStatus::Sent => "sent",
            SendStatus::Failed => "failed",
            SendStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SendStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(SendStatus::Sent),
            "failed" => Ok(SendStatus::Failed),
            "pending" => Ok(SendStatus::Pending),
            _ => Err(format!("unknown send status: {s}")),
        }
    }
}

/// A recorded outbound mail.
///
/// Records are immutable once written; there are no edit or delete
/// operations in this system.
#[derive(Debug, Clone)]
pub struct SentMail {
    /// Record ID.
    pub id: i64,
    /// Owning user ID.
    pub user_id: i64,
    /// Recipient (To) address.
    pub to: String,
    /// CC address, if any.
    pub cc: Option<String>,
    /// BCC address, if any.
    pub bcc: Option<String>,
    /// Subject (sanitized form, as dispatched).
    pub subject: String,
    /// Body (sanitized form, as dispatched).
    pub body: String,
    /// Relay-assigned message identifier.
    pub message_id: Option<String>,
    /// Delivery status.
    pub status: SendStatus,
    /// When the record was written.
    pub sent_at: DateTime<Utc>,
}

/// Data for creating a sent mail record.
#[derive(Debug, Clone)]
pub struct NewSentMail {
    /// Owning user ID.
    pub user_id: i64,
    /// Recipient (To) address.
    pub to: String,
    /// CC address, if any.
    pub cc: Option<String>,
    /// BCC address, if any.
    pub bcc: Option<String>,
    /// Subject.
    pub subject: String,
    /// Body.
    pub body: String,
    /// Relay-assigned message identifier.
    pub message_id: Option<String>,
    /// Delivery status.
    pub status: SendStatus,
}

impl NewSentMail {
    /// Create a record for a successfully dispatched mail.
    pub fn sent(
        user_id: i64,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            to: to.into(),
            cc: None,
            bcc: None,
            subject: subject.into(),
            body: body.into(),
            message_id: Some(message_id.into()),
            status: SendStatus::Sent,
        }
    }

    /// Set the CC address.
    pub fn with_cc(mut self, cc: Option<String>) -> Self {
        self.cc = cc;
        self
    }

    /// Set the BCC address.
    pub fn with_bcc(mut self, bcc: Option<String>) -> Self {
        self.bcc = bcc;
        self
    }
}
