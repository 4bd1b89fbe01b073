//! Error types for the harness

use thiserror::Error;

/// Result type alias using [`HarnessError`]
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// Harness error taxonomy
#[derive(Error, Debug)]
pub enum HarnessError {
    /// A fixture or API precondition failed; the dependent scenario never starts.
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Fixture not found: {0}")]
    FixtureNotFound(String),

    /// The UI did not reach the expected state within the bounded wait.
    #[error("No element matched {selectors:?} within {timeout_ms}ms")]
    ElementNotFound {
        selectors: Vec<String>,
        timeout_ms: u64,
    },

    /// Observed value mismatched the expectation at a given step.
    #[error("Assertion failed at step {step_index}: expected {expected:?}, got {actual:?}")]
    Assertion {
        expected: String,
        actual: String,
        step_index: usize,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {context}")]
    UnexpectedStatus { status: u16, context: String },

    #[error("Invalid load profile: {0}")]
    InvalidProfile(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    DriverNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
