//! Shared helpers for pipeline integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use outpost::dispatch::{DispatchError, DispatchReceipt, MailTransport, OutboundMail};
use outpost::pipeline::{SendPipeline, SendRequest};
use outpost::rate_limit::{RateLimitConfig, RateLimiter};
use outpost::session::SessionManager;
use outpost::Database;

/// Transport stub that records every dispatch and either succeeds with a
/// fixed message id or fails with a fixed error.
pub struct StubTransport {
    fail: bool,
    calls: AtomicUsize,
    last_mail: Mutex<Option<OutboundMail>>,
}

impl StubTransport {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
            last_mail: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
            last_mail: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_mail(&self) -> Option<OutboundMail> {
        self.last_mail.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for StubTransport {
    async fn send(&self, mail: &OutboundMail) -> Result<DispatchReceipt, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_mail.lock().unwrap() = Some(mail.clone());

        if self.fail {
            Err(DispatchError::Smtp("relay down".to_string()))
        } else {
            Ok(DispatchReceipt {
                message_id: "M1".to_string(),
            })
        }
    }

    async fn verify(&self) -> bool {
        !self.fail
    }
}

/// A fully wired pipeline over an in-memory database.
pub struct TestHarness {
    pub pipeline: SendPipeline,
    pub sessions: Arc<SessionManager>,
    pub transport: Arc<StubTransport>,
    pub limiter: Arc<RateLimiter>,
    pub database: Database,
}

impl TestHarness {
    /// Build a harness with the default 50-per-hour limit.
    pub async fn new(transport: Arc<StubTransport>) -> Self {
        Self::with_limit(transport, RateLimitConfig::default()).await
    }

    /// Build a harness with a custom rate limit.
    pub async fn with_limit(transport: Arc<StubTransport>, limit: RateLimitConfig) -> Self {
        let database = Database::open_in_memory().await.unwrap();
        database.migrate().await.unwrap();

        let sessions = Arc::new(SessionManager::new());
        let limiter = Arc::new(RateLimiter::new(limit));

        let pipeline = SendPipeline::new(
            sessions.clone(),
            limiter.clone(),
            transport.clone(),
            database.pool().clone(),
        );

        Self {
            pipeline,
            sessions,
            transport,
            limiter,
            database,
        }
    }

    /// Create a session for a user and return its token.
    pub fn login(&self, user_id: i64) -> String {
        self.sessions.create_session(user_id).token
    }
}

/// A well-formed send request.
pub fn sample_request() -> SendRequest {
    SendRequest {
        to: "alice@example.com".to_string(),
        cc: None,
        bcc: None,
        subject: "Meeting notes".to_string(),
        body: "See attached.".to_string(),
    }
}
