//! Session memoization
//!
//! Logging in over the network once per scenario adds up fast; the cache
//! guarantees at most one live login call per unique credential pair per
//! run. The cache is an explicit per-run object handed to scenarios, never
//! a process-wide singleton.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::{ApiClient, LoginOutcome};
use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::Credential;

/// Anything that can exchange credentials for a token.
///
/// [`ApiClient`] is the production implementation; tests substitute a
/// counting fake to verify call amortization.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> HarnessResult<LoginOutcome>;
}

#[async_trait]
impl Authenticator for ApiClient {
    async fn login(&self, email: &str, password: &str) -> HarnessResult<LoginOutcome> {
        ApiClient::login(self, email, password).await
    }
}

/// An authenticated context usable for subsequent authorized calls
#[derive(Debug, Clone)]
pub struct Session {
    pub credential: Credential,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// Memoizes sessions keyed by (email, password).
///
/// The map lock is held across the login await, so concurrent callers with
/// the same credentials cannot race a second login into flight.
#[derive(Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<(String, String), Session>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached session for `credential`, logging in on first use.
    ///
    /// A failed login caches nothing and surfaces as a setup failure;
    /// the next call retries instead of replaying the failure.
    pub async fn get_or_create(
        &self,
        auth: &dyn Authenticator,
        credential: &Credential,
    ) -> HarnessResult<Session> {
        let key = (credential.email.clone(), credential.password.clone());
        let mut entries = self.entries.lock().await;

        if let Some(session) = entries.get(&key) {
            debug!("Session cache hit for {}", credential.email);
            return Ok(session.clone());
        }

        let outcome = auth.login(&credential.email, &credential.password).await?;
        let token = match outcome.token {
            Some(token) if outcome.is_success() => token,
            _ => {
                return Err(HarnessError::Setup(format!(
                    "login for {} returned status {}",
                    credential.email, outcome.status
                )))
            }
        };

        let session = Session {
            credential: credential.clone(),
            token,
            created_at: Utc::now(),
        };
        entries.insert(key, session.clone());
        debug!("Session cached for {}", credential.email);
        Ok(session)
    }

    /// Drop every cached session. Called at the start of a fresh run.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of live cached sessions
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
