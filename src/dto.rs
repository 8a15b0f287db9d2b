//! Wire-format request and response shapes.
//!
//! These mirror the JSON bodies of the compose and sent-history endpoints;
//! conversions from the pipeline's domain types live here so serialization
//! details stay out of the pipeline itself.

use serde::{Deserialize, Serialize};

use crate::pipeline::{SendReceipt, SendRequest, SentPage};
use crate::sent::SentMail;

/// Request body for sending a mail.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMailRequest {
    pub to: String,
    #[serde(default)]
    pub cc: Option<String>,
    #[serde(default)]
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
}

impl From<SendMailRequest> for SendRequest {
    fn from(req: SendMailRequest) -> Self {
        Self {
            to: req.to,
            cc: req.cc,
            bcc: req.bcc,
            subject: req.subject,
            body: req.body,
        }
    }
}

/// Successful send response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailResponse {
    pub success: bool,
    pub message_id: String,
    pub sent_mail: SentMailSummary,
}

/// Abbreviated record returned with a send confirmation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMailSummary {
    pub id: i64,
    pub to: String,
    pub subject: String,
    pub sent_at: String,
}

impl From<SendReceipt> for SendMailResponse {
    fn from(receipt: SendReceipt) -> Self {
        Self {
            success: true,
            message_id: receipt.message_id,
            sent_mail: SentMailSummary {
                id: receipt.record.id,
                to: receipt.record.to,
                subject: receipt.record.subject,
                sent_at: receipt.record.sent_at.to_rfc3339(),
            },
        }
    }
}

/// One record in a sent-history listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMailItem {
    pub id: i64,
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub status: String,
    pub sent_at: String,
    pub message_id: Option<String>,
}

impl From<SentMail> for SentMailItem {
    fn from(mail: SentMail) -> Self {
        Self {
            id: mail.id,
            to: mail.to,
            cc: mail.cc,
            bcc: mail.bcc,
            subject: mail.subject,
            body: mail.body,
            status: mail.status.to_string(),
            sent_at: mail.sent_at.to_rfc3339(),
            message_id: mail.message_id,
        }
    }
}

/// Sent-history listing with pagination metadata.
#[derive(Debug, Serialize)]
pub struct ListSentResponse {
    pub emails: Vec<SentMailItem>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Current page number (1-based).
    pub page: i64,
    /// Items per page.
    pub limit: i64,
    /// Total number of items.
    pub total: i64,
    /// Total number of pages at this limit.
    pub pages: i64,
}

impl From<SentPage> for ListSentResponse {
    fn from(page: SentPage) -> Self {
        let pages = page.total_pages();
        Self {
            emails: page.emails.into_iter().map(SentMailItem::from).collect(),
            pagination: PaginationMeta {
                page: page.page,
                limit: page.limit,
                total: page.total,
                pages,
            },
        }
    }
}
