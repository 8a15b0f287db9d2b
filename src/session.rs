//! Session tokens and caller identity resolution.
//!
//! The send pipeline only needs to answer one question per request: which
//! user does this token belong to? `IdentityProvider` is that seam, and
//! `SessionManager` is the in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

/// Default session duration (24 hours).
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 24 * 60 * 60;

/// Resolves a bearer token to a user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the user id for a valid token, or `None` for an unknown or
    /// expired one.
    async fn resolve(&self, token: &str) -> Option<i64>;
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session token (UUID v4).
    pub token: String,
    /// User ID associated with this session.
    pub user_id: i64,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn new(user_id: i64, duration: Duration) -> Self {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(duration).unwrap_or_default();

        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            created_at: now,
            expires_at,
        }
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// In-memory store of active sessions, keyed by token.
#[derive(Debug)]
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
    duration: Duration,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// Create a manager with the default 24-hour session duration.
    pub fn new() -> Self {
        Self::with_duration(Duration::from_secs(DEFAULT_SESSION_DURATION_SECS))
    }

    /// Create a manager with a custom session duration.
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            duration,
        }
    }

    /// Start a session for a user and return it.
    pub fn create_session(&self, user_id: i64) -> Session {
        let session = Session::new(user_id, self.duration);
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session.token.clone(), session.clone());

        info!(user_id, token = %session.token, "Session created");
        session
    }

    /// Revoke a session by token. Returns whether a session was removed.
    pub fn revoke(&self, token: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let removed = sessions.remove(token).is_some();
        if removed {
            info!(token = %token, "Session revoked");
        }
        removed
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());

        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Purged expired sessions");
        }
        removed
    }

    /// Number of tracked sessions, expired included until purged.
    pub fn session_count(&self) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.len()
    }
}

#[async_trait]
impl IdentityProvider for SessionManager {
    async fn resolve(&self, token: &str) -> Option<i64> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get(token) {
            Some(session) if !session.is_expired() => Some(session.user_id),
            Some(_) => {
                // Expired entries are dropped on touch rather than waiting
                // for the next purge.
                sessions.remove(token);
                debug!(token = %token, "Rejected expired session token");
                None
            }
            None => None,
        }
    }
}
