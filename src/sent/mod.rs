//! Sent mail records for Outpost.
//!
//! Durable history of outbound mail: one immutable record per dispatched
//! message, listed newest first with per-owner isolation.

mod repository;
mod types;

pub use repository::SentMailRepository;
pub use types::{NewSentMail, SendStatus, SentMail};
