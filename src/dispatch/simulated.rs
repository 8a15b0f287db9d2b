//! Simulated dispatch for running without a relay.

use async_trait::async_trait;
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use tracing::info;

use super::{DispatchError, DispatchReceipt, MailTransport, OutboundMail};

/// Dispatcher that fabricates message IDs instead of contacting a relay.
///
/// Selected when SMTP credentials are absent; lets the whole send pipeline
/// be exercised in development and tests.
#[derive(Debug, Default)]
pub struct SimulatedDispatcher;

impl SimulatedDispatcher {
    /// Create a simulated dispatcher.
    pub fn new() -> Self {
        Self
    }

    fn fabricate_message_id() -> String {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(char::from)
            .collect();
        format!("sim-{}-{}", Utc::now().timestamp_millis(), suffix)
    }
}

#[async_trait]
impl MailTransport for SimulatedDispatcher {
    async fn send(&self, mail: &OutboundMail) -> Result<DispatchReceipt, DispatchError> {
        let message_id = Self::fabricate_message_id();
        info!(to = %mail.to, %message_id, "simulated send");
        Ok(DispatchReceipt { message_id })
    }

    async fn verify(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mail() -> OutboundMail {
        OutboundMail {
            to: "a@b.com".to_string(),
            cc: None,
            bcc: None,
            subject: "Hi".to_string(),
            text: "body".to_string(),
        }
    }

    #[tokio::test]
    async fn test_simulated_send_succeeds() {
        let dispatcher = SimulatedDispatcher::new();
        let receipt = dispatcher.send(&sample_mail()).await.unwrap();
        assert!(receipt.message_id.starts_with("sim-"));
    }

    #[tokio::test]
    async fn test_message_ids_are_unique() {
        let dispatcher = SimulatedDispatcher::new();
        let a = dispatcher.send(&sample_mail()).await.unwrap();
        let b = dispatcher.send(&sample_mail()).await.unwrap();
        assert_ne!(a.message_id, b.message_id);
    }

    #[tokio::test]
    async fn test_verify_always_healthy() {
        assert!(SimulatedDispatcher::new().verify().await);
    }
}
