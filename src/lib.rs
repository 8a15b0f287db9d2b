//! Outpost - webmail send pipeline
//!
//! Validates, rate-limits, dispatches and records outbound email on behalf
//! of authenticated users.

pub mod config;
pub mod db;
pub mod dispatch;
pub mod dto;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod rate_limit;
pub mod sent;
pub mod session;
pub mod validation;

pub use config::Config;
pub use db::Database;
pub use dispatch::{
    build_transport, DispatchError, DispatchReceipt, MailTransport, OutboundMail,
    SimulatedDispatcher, SmtpDispatcher,
};
pub use dto::{ListSentResponse, SendMailRequest, SendMailResponse};
pub use error::{OutpostError, Result};
pub use pipeline::{SendPipeline, SendReceipt, SendRequest, SentPage};
pub use rate_limit::{spawn_sweeper, RateLimitConfig, RateLimitDecision, RateLimiter};
pub use sent::{NewSentMail, SendStatus, SentMail, SentMailRepository};
pub use session::{IdentityProvider, Session, SessionManager};
pub use validation::{is_valid_email, sanitize_body, sanitize_subject, MAX_SUBJECT_LENGTH};
