//! SMTP dispatch over lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::{Header, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DispatchError, DispatchReceipt, MailTransport, OutboundMail};
use crate::config::SmtpConfig;

/// Standard implicit-TLS submission port.
const SMTPS_PORT: u16 = 465;

/// `X-Mailer` deliverability header.
#[derive(Debug, Clone)]
struct XMailer(String);

impl Header for XMailer {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Mailer")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// `X-Priority` header, fixed at normal priority.
#[derive(Debug, Clone)]
struct XPriority(String);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// Live SMTP dispatcher.
///
/// Holds one long-lived lettre transport; lettre pools connections
/// internally, so concurrent sends do not corrupt each other.
pub struct SmtpDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpDispatcher {
    /// Create a dispatcher from relay configuration.
    ///
    /// Port 465 selects implicit TLS; any other port upgrades in-band via
    /// STARTTLS.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, DispatchError> {
        let from_address = config
            .effective_from()
            .ok_or_else(|| DispatchError::MissingConfig("from address".to_string()))?;
        let from: Mailbox = from_address
            .parse()
            .map_err(|_| DispatchError::InvalidAddress(from_address.to_string()))?;

        let mut builder = if config.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| DispatchError::Smtp(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| DispatchError::Smtp(e.to_string()))?
        };

        builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Build the lettre message for an outbound mail.
    ///
    /// Returns the message together with its generated Message-ID, which is
    /// reported back to the caller on success.
    fn build_message(&self, mail: &OutboundMail) -> Result<(Message, String), DispatchError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|_| DispatchError::InvalidAddress(mail.to.clone()))?;

        let message_id = generate_message_id(&self.from);

        let mut builder = Message::builder()
            .from(self.from.clone())
            .reply_to(self.from.clone())
            .to(to)
            .subject(&mail.subject)
            .message_id(Some(message_id.clone()))
            .header(XMailer("Outpost".to_string()))
            .header(XPriority("3".to_string()));

        if let Some(cc) = &mail.cc {
            let mailbox: Mailbox = cc
                .parse()
                .map_err(|_| DispatchError::InvalidAddress(cc.clone()))?;
            builder = builder.cc(mailbox);
        }

        if let Some(bcc) = &mail.bcc {
            let mailbox: Mailbox = bcc
                .parse()
                .map_err(|_| DispatchError::InvalidAddress(bcc.clone()))?;
            builder = builder.bcc(mailbox);
        }

        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                mail.text.clone(),
                render_html_body(&mail.text),
            ))
            .map_err(|e| DispatchError::Build(e.to_string()))?;

        Ok((message, message_id))
    }
}

#[async_trait]
impl MailTransport for SmtpDispatcher {
    async fn send(&self, mail: &OutboundMail) -> Result<DispatchReceipt, DispatchError> {
        let (message, message_id) = self.build_message(mail)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DispatchError::Smtp(e.to_string()))?;

        debug!(to = %mail.to, %message_id, "message accepted by relay");
        Ok(DispatchReceipt { message_id })
    }

    async fn verify(&self) -> bool {
        match self.transport.test_connection().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("SMTP connection probe failed: {e}");
                false
            }
        }
    }
}

/// Generate a Message-ID scoped to the sender's domain.
fn generate_message_id(from: &Mailbox) -> String {
    format!("<{}@{}>", Uuid::new_v4(), from.email.domain())
}

/// Render the HTML fallback for a plain-text body.
///
/// Escapes HTML metacharacters, turns newlines into `<br>`, and wraps the
/// result in a minimal document.
fn render_html_body(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br>\n");

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n\
         <body style=\"font-family: Arial, sans-serif; line-height: 1.6;\">\n\
         <div>{escaped}</div>\n\
         </body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("mailer@example.com".to_string()),
            password: Some("secret".to_string()),
            from_address: Some("noreply@example.com".to_string()),
            timeout_secs: 10,
        }
    }

    fn sample_mail() -> OutboundMail {
        OutboundMail {
            to: "a@b.com".to_string(),
            cc: Some("c@d.com".to_string()),
            bcc: None,
            subject: "Hi there".to_string(),
            text: "line1\nline2".to_string(),
        }
    }

    #[test]
    fn test_from_config_requires_from_address() {
        let mut config = configured();
        config.username = None;
        config.from_address = None;

        let result = SmtpDispatcher::from_config(&config);
        assert!(matches!(result, Err(DispatchError::MissingConfig(_))));
    }

    #[test]
    fn test_from_config_rejects_bad_from() {
        let mut config = configured();
        config.from_address = Some("not-an-address".to_string());

        let result = SmtpDispatcher::from_config(&config);
        assert!(matches!(result, Err(DispatchError::InvalidAddress(_))));
    }

    #[test]
    fn test_build_message_headers() {
        let dispatcher = SmtpDispatcher::from_config(&configured()).unwrap();
        let (message, message_id) = dispatcher.build_message(&sample_mail()).unwrap();

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("From: noreply@example.com"));
        assert!(formatted.contains("Reply-To: noreply@example.com"));
        assert!(formatted.contains("To: a@b.com"));
        assert!(formatted.contains("Cc: c@d.com"));
        assert!(formatted.contains("X-Mailer: Outpost"));
        assert!(formatted.contains("X-Priority: 3"));
        assert!(message_id.contains("@example.com"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let dispatcher = SmtpDispatcher::from_config(&configured()).unwrap();
        let mut mail = sample_mail();
        mail.to = "nope".to_string();

        let result = dispatcher.build_message(&mail);
        assert!(matches!(result, Err(DispatchError::InvalidAddress(_))));
    }

    #[test]
    fn test_render_html_body() {
        let html = render_html_body("a < b\nsecond & third");
        assert!(html.contains("a &lt; b<br>"));
        assert!(html.contains("second &amp; third"));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_message_ids_unique_per_message() {
        let from: Mailbox = "noreply@example.com".parse().unwrap();
        assert_ne!(generate_message_id(&from), generate_message_id(&from));
    }
}
