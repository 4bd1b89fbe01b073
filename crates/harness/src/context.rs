//! Per-run harness context
//!
//! One context per test run, passed explicitly to whatever needs it.
//! Nothing here is a process-wide singleton; two concurrent runs get two
//! contexts and never share sessions.

use tracing::debug;

use crate::api::{ApiClient, SetupOutcome};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::FixtureProvider;
use crate::session::{Session, SessionCache};

/// Bundles the fixture provider, API client, and session cache for one run
pub struct RunContext {
    pub config: HarnessConfig,
    pub fixtures: FixtureProvider,
    pub api: ApiClient,
    pub sessions: SessionCache,
}

impl RunContext {
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        let api = ApiClient::new(&config)?;
        Ok(Self {
            config,
            fixtures: FixtureProvider::builtin(),
            api,
            sessions: SessionCache::new(),
        })
    }

    /// Authenticated session for a named user fixture.
    ///
    /// Registers the account first (duplicate email is fine) so suites can
    /// run against a clean database, then logs in through the cache.
    pub async fn session_for(&self, fixture_name: &str) -> HarnessResult<Session> {
        let credential = self.fixtures.user(fixture_name)?;

        match self
            .api
            .register(&credential.email, &credential.username, &credential.password)
            .await?
        {
            SetupOutcome::Created { .. } => {
                debug!("Registered {} for fixture {}", credential.email, fixture_name);
            }
            SetupOutcome::AlreadyExists => {
                debug!("{} already registered", credential.email);
            }
            SetupOutcome::Failed(reason) => {
                return Err(HarnessError::Setup(format!(
                    "registering {} failed: {reason}",
                    credential.email
                )));
            }
        }

        self.sessions.get_or_create(&self.api, &credential).await
    }
}
