//! Mail dispatch for Outpost.
//!
//! [`MailTransport`] is the seam between the send pipeline and the SMTP
//! relay. Two implementations exist, selected once at construction time:
//! a live [`SmtpDispatcher`] when relay credentials are configured, and a
//! [`SimulatedDispatcher`] otherwise so the rest of the pipeline can run
//! without live infrastructure.

mod simulated;
mod smtp;

pub use simulated::SimulatedDispatcher;
pub use smtp::SmtpDispatcher;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::SmtpConfig;

/// Dispatch errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Required configuration is missing.
    #[error("missing required config: {0}")]
    MissingConfig(String),

    /// An address could not be parsed into a mailbox.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Message construction failed.
    #[error("failed to build message: {0}")]
    Build(String),

    /// Transport or protocol failure talking to the relay.
    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// An outbound message ready for dispatch.
///
/// Subject and body are expected to be sanitized by the caller.
#[derive(Debug, Clone)]
pub struct OutboundMail {
    /// Recipient (To) address.
    pub to: String,
    /// CC address, if any.
    pub cc: Option<String>,
    /// BCC address, if any.
    pub bcc: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body. An HTML fallback is rendered at dispatch time.
    pub text: String,
}

/// Successful dispatch outcome.
#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    /// Relay-assigned (or fabricated, in simulated mode) message identifier.
    pub message_id: String,
}

/// Async mail dispatch trait.
///
/// Implement this to provide alternative backends; tests use stub
/// implementations.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Dispatch a message. No retry is performed; any error is terminal for
    /// this attempt.
    async fn send(&self, mail: &OutboundMail) -> Result<DispatchReceipt, DispatchError>;

    /// Probe relay reachability and authentication without sending.
    async fn verify(&self) -> bool;
}

/// Build the dispatcher variant the configuration calls for.
///
/// Credentials present selects the live SMTP dispatcher; otherwise the
/// simulated one. The choice is made here, once, so the pipeline never
/// branches on configuration.
pub fn build_transport(config: &SmtpConfig) -> Result<Arc<dyn MailTransport>, DispatchError> {
    if config.has_credentials() {
        Ok(Arc::new(SmtpDispatcher::from_config(config)?))
    } else {
        info!("SMTP credentials not configured, using simulated dispatch");
        Ok(Arc::new(SimulatedDispatcher::new()))
    }
}
