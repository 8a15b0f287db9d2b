//! The send pipeline.
//!
//! One entry point per user-facing operation: `send` walks a request
//! through identity, validation, rate limiting, dispatch and persistence
//! in that order, and `list_sent` pages through a user's send history.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::dispatch::{MailTransport, OutboundMail};
use crate::error::{OutpostError, Result};
use crate::rate_limit::RateLimiter;
use crate::sent::{NewSentMail, SentMail, SentMailRepository};
use crate::session::IdentityProvider;
use crate::validation::{is_valid_email, sanitize_body, sanitize_subject};

/// Default page size for listing sent mail.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// A request to send one email.
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// Recipient address.
    pub to: String,
    /// Optional CC address.
    pub cc: Option<String>,
    /// Optional BCC address.
    pub bcc: Option<String>,
    /// Subject line, sanitized before dispatch.
    pub subject: String,
    /// Plain-text body, sanitized before dispatch.
    pub body: String,
}

/// Outcome of a successful send.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Relay-assigned (or fabricated) message identifier.
    pub message_id: String,
    /// The persisted record of the send.
    pub record: SentMail,
}

/// One page of a user's send history.
#[derive(Debug, Clone)]
pub struct SentPage {
    /// Records on this page, newest first.
    pub emails: Vec<SentMail>,
    /// 1-based page number.
    pub page: i64,
    /// Page size used.
    pub limit: i64,
    /// Total records for the user across all pages.
    pub total: i64,
}

impl SentPage {
    /// Number of pages at the current limit.
    pub fn total_pages(&self) -> i64 {
        if self.limit <= 0 {
            return 0;
        }
        (self.total + self.limit - 1) / self.limit
    }
}

/// Orchestrates the full lifecycle of outbound mail.
pub struct SendPipeline {
    identity: Arc<dyn IdentityProvider>,
    limiter: Arc<RateLimiter>,
    transport: Arc<dyn MailTransport>,
    pool: SqlitePool,
}

impl SendPipeline {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        limiter: Arc<RateLimiter>,
        transport: Arc<dyn MailTransport>,
        pool: SqlitePool,
    ) -> Self {
        Self {
            identity,
            limiter,
            transport,
            pool,
        }
    }

    /// Send one email on behalf of the token's user.
    ///
    /// Stages run strictly in order: identity, field validation, rate limit,
    /// dispatch, persistence. A failure at any stage stops the pipeline, so
    /// an invalid request never consumes quota and a rejected send never
    /// reaches the relay. Quota is consumed before dispatch, which means a
    /// relay failure still costs one send from the window.
    pub async fn send(&self, token: &str, request: &SendRequest) -> Result<SendReceipt> {
        let user_id = self
            .identity
            .resolve(token)
            .await
            .ok_or(OutpostError::Unauthorized)?;

        let request = validate(request)?;

        let decision = self.limiter.check_and_consume(user_id);
        if !decision.allowed {
            warn!(user_id, reset_at = %decision.reset_at, "Send rejected: rate limit exceeded");
            return Err(OutpostError::RateLimited {
                reset_at: decision.reset_at,
            });
        }

        let subject = sanitize_subject(&request.subject);
        let body = sanitize_body(&request.body);

        let outbound = OutboundMail {
            to: request.to.clone(),
            cc: request.cc.clone(),
            bcc: request.bcc.clone(),
            subject: subject.clone(),
            text: body.clone(),
        };

        let receipt = self.transport.send(&outbound).await.map_err(|e| {
            error!(user_id, to = %request.to, "Dispatch failed: {e}");
            OutpostError::Delivery(e.to_string())
        })?;

        let record = NewSentMail::sent(user_id, &request.to, &subject, &body, &receipt.message_id)
            .with_cc(request.cc.clone())
            .with_bcc(request.bcc.clone());

        let repository = SentMailRepository::new(&self.pool);
        let record = repository.create(&record).await.map_err(|e| {
            // The relay already accepted this message; report the missing
            // audit record as its own failure class.
            error!(
                user_id,
                message_id = %receipt.message_id,
                "Delivered but failed to record: {e}"
            );
            OutpostError::Persistence(e.to_string())
        })?;

        info!(
            user_id,
            record_id = record.id,
            message_id = %receipt.message_id,
            remaining = decision.remaining,
            "Mail sent"
        );

        Ok(SendReceipt {
            message_id: receipt.message_id,
            record,
        })
    }

    /// List the token's user's sent mail, newest first.
    ///
    /// `page` is 1-based; values below 1 are treated as 1. `limit` is
    /// clamped to `1..=MAX_PAGE_LIMIT`.
    pub async fn list_sent(&self, token: &str, page: i64, limit: i64) -> Result<SentPage> {
        let user_id = self
            .identity
            .resolve(token)
            .await
            .ok_or(OutpostError::Unauthorized)?;

        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);

        let repository = SentMailRepository::new(&self.pool);
        let (emails, total) = repository.list_by_user(user_id, page, limit).await?;

        Ok(SentPage {
            emails,
            page,
            limit,
            total,
        })
    }
}

/// Check required fields and address syntax.
///
/// Returns a request with empty optional addresses normalized to `None`.
fn validate(request: &SendRequest) -> Result<SendRequest> {
    if request.to.trim().is_empty() {
        return Err(OutpostError::validation("to", "recipient is required"));
    }
    if request.subject.trim().is_empty() {
        return Err(OutpostError::validation("subject", "subject is required"));
    }
    if request.body.trim().is_empty() {
        return Err(OutpostError::validation("body", "body is required"));
    }

    if !is_valid_email(&request.to) {
        return Err(OutpostError::validation(
            "to",
            "invalid recipient email address",
        ));
    }

    let cc = normalize_optional(&request.cc);
    if let Some(cc) = &cc {
        if !is_valid_email(cc) {
            return Err(OutpostError::validation("cc", "invalid CC email address"));
        }
    }

    let bcc = normalize_optional(&request.bcc);
    if let Some(bcc) = &bcc {
        if !is_valid_email(bcc) {
            return Err(OutpostError::validation("bcc", "invalid BCC email address"));
        }
    }

    Ok(SendRequest {
        to: request.to.clone(),
        cc,
        bcc,
        subject: request.subject.clone(),
        body: request.body.clone(),
    })
}

fn normalize_optional(value: &Option<String>) -> Option<String> {
    match value {
        Some(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SendRequest {
        SendRequest {
            to: "a@b.com".to_string(),
            cc: None,
            bcc: None,
            subject: "Hello".to_string(),
            body: "World".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_request() {
        assert!(validate(&request()).is_ok());
    }

    #[test]
    fn test_validate_requires_to_subject_body() {
        for (field, mutate) in [
            ("to", Box::new(|r: &mut SendRequest| r.to = "  ".to_string())
                as Box<dyn Fn(&mut SendRequest)>),
            ("subject", Box::new(|r: &mut SendRequest| r.subject.clear())),
            ("body", Box::new(|r: &mut SendRequest| r.body.clear())),
        ] {
            let mut req = request();
            mutate(&mut req);
            match validate(&req) {
                Err(OutpostError::Validation { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected validation error on {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validate_rejects_bad_addresses() {
        let mut req = request();
        req.to = "nope".to_string();
        assert!(matches!(
            validate(&req),
            Err(OutpostError::Validation { field, .. }) if field == "to"
        ));

        let mut req = request();
        req.cc = Some("also nope".to_string());
        assert!(matches!(
            validate(&req),
            Err(OutpostError::Validation { field, .. }) if field == "cc"
        ));

        let mut req = request();
        req.bcc = Some("@bad".to_string());
        assert!(matches!(
            validate(&req),
            Err(OutpostError::Validation { field, .. }) if field == "bcc"
        ));
    }

    #[test]
    fn test_validate_normalizes_empty_optionals() {
        let mut req = request();
        req.cc = Some("   ".to_string());
        req.bcc = Some(String::new());

        let validated = validate(&req).unwrap();
        assert_eq!(validated.cc, None);
        assert_eq!(validated.bcc, None);
    }

    #[test]
    fn test_total_pages() {
        let page = |total, limit| SentPage {
            emails: Vec::new(),
            page: 1,
            limit,
            total,
        };

        assert_eq!(page(0, 20).total_pages(), 0);
        assert_eq!(page(1, 20).total_pages(), 1);
        assert_eq!(page(20, 20).total_pages(), 1);
        assert_eq!(page(21, 20).total_pages(), 2);
    }
}
