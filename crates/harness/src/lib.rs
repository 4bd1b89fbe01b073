//! Conduit test harness
//!
//! A scenario and load-test harness for RealWorld ("Conduit") deployments:
//! - Supplies named, immutable fixtures (users, articles)
//! - Performs setup/teardown straight against the HTTP API
//! - Memoizes authenticated sessions per credential pair
//! - Executes declarative YAML scenarios through a Playwright-driven browser
//! - Assembles load-stage profiles and checks metrics against thresholds
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       RunContext                            │
//! │   FixtureProvider ──► ApiClient ──► SessionCache            │
//! │        (data)          (setup)       (auth reuse)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner<D: PageDriver>                              │
//! │    ├── Scenario (YAML): navigate / fill / click / wait /    │
//! │    │                    assert                              │
//! │    └── PlaywrightDriver: generated Node scripts             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LoadProfile: stages + thresholds ──► LoadEngine (external) │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod fixtures;
pub mod load;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod session;

pub use api::{ApiClient, Article, ArticleQuery, LoginOutcome, Profile, SetupOutcome};
pub use config::HarnessConfig;
pub use context::RunContext;
pub use error::{HarnessError, HarnessResult};
pub use fixtures::{ArticleFixture, Credential, Fixture, FixtureProvider};
pub use load::{LoadEngine, LoadProfile, LoadStage, Metrics, Thresholds};
pub use playwright::PlaywrightDriver;
pub use runner::{PageDriver, ScenarioRunner, SuiteReport};
pub use scenario::{Scenario, ScenarioStep, Selector};
pub use session::{Authenticator, Session, SessionCache};
