//! Scenario execution
//!
//! The runner drives an ordered list of steps through a [`PageDriver`],
//! fail-fast: the first failed step halts the scenario. Independent
//! scenarios are isolated; one failure never touches its siblings.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::scenario::{Scenario, ScenarioStep, Selector};

/// The seam between the runner and the rendered environment.
///
/// Waits are bounded condition polls, never fixed sleeps; a selector that
/// does not match within the timeout is an
/// [`HarnessError::ElementNotFound`].
#[async_trait]
pub trait PageDriver: Send {
    /// Discard page state before a scenario starts; scenarios must not see
    /// each other's DOM.
    async fn reset(&mut self) -> HarnessResult<()> {
        Ok(())
    }

    async fn navigate(&mut self, path: &str) -> HarnessResult<()>;

    /// Wait for any candidate of `selector` to become visible. Returns the
    /// candidate that matched.
    async fn wait_for(&mut self, selector: &Selector, timeout_ms: u64) -> HarnessResult<String>;

    async fn fill(&mut self, selector: &Selector, value: &str) -> HarnessResult<()>;

    async fn click(&mut self, selector: &Selector, timeout_ms: u64) -> HarnessResult<()>;

    /// Text content of the first matching candidate
    async fn text_of(&mut self, selector: &Selector, timeout_ms: u64) -> HarnessResult<String>;

    /// Number of elements matching the first candidate that matches at all
    /// (zero when nothing matches)
    async fn count_of(&mut self, selector: &Selector) -> HarnessResult<usize>;
}

/// Scenario lifecycle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Navigating,
    Interacting,
    Asserting,
    Passed,
    Failed,
}

/// Result of one executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub label: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub passed: bool,
    pub state: Phase,
    pub steps: Vec<StepReport>,
    pub failed_step: Option<usize>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Aggregate over a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub reports: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> HarnessResult<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Suite report written to {}", path.display());
        Ok(path.to_path_buf())
    }
}

/// Executes scenarios against a [`PageDriver`]
pub struct ScenarioRunner<D: PageDriver> {
    driver: D,
    default_timeout_ms: u64,
}

impl<D: PageDriver> ScenarioRunner<D> {
    pub fn new(driver: D, config: &HarnessConfig) -> Self {
        Self {
            driver,
            default_timeout_ms: config.default_timeout_ms,
        }
    }

    /// Give the driver back, e.g. to inspect it after a run
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Run one scenario, fail-fast, returning a full report.
    pub async fn run(&mut self, scenario: &Scenario) -> ScenarioReport {
        let start = Instant::now();
        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut failed_step = None;
        let mut error = None;

        debug!("Running scenario: {}", scenario.name);

        if let Err(e) = self.driver.reset().await {
            return ScenarioReport {
                name: scenario.name.clone(),
                passed: false,
                state: Phase::Failed,
                steps,
                failed_step: None,
                error: Some(format!("driver reset failed: {e}")),
                duration_ms: start.elapsed().as_millis() as u64,
            };
        }

        for (index, step) in scenario.steps.iter().enumerate() {
            debug!("{} -> {:?}", step.label(), phase_of(step));
            let step_start = Instant::now();
            let result = self.execute_step(index, step).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    steps.push(StepReport {
                        index,
                        label: step.label(),
                        success: true,
                        duration_ms,
                        error: None,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    steps.push(StepReport {
                        index,
                        label: step.label(),
                        success: false,
                        duration_ms,
                        error: Some(message.clone()),
                    });
                    failed_step = Some(index);
                    error = Some(message);
                    break;
                }
            }
        }

        let state = if error.is_none() { Phase::Passed } else { Phase::Failed };

        ScenarioReport {
            name: scenario.name.clone(),
            passed: error.is_none(),
            state,
            steps,
            failed_step,
            error,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Run a list of scenarios. Each runs to its own verdict; a failure in
    /// one never aborts the rest.
    pub async fn run_all(&mut self, scenarios: &[Scenario]) -> SuiteReport {
        let start = Instant::now();
        let mut reports = Vec::with_capacity(scenarios.len());
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let report = self.run(scenario).await;
            if report.passed {
                passed += 1;
                info!("ok   {} ({} ms)", report.name, report.duration_ms);
            } else {
                failed += 1;
                error!(
                    "FAIL {} at step {} - {}",
                    report.name,
                    report.failed_step.map(|i| i.to_string()).unwrap_or_default(),
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
            reports.push(report);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("{} passed, {} failed ({} ms)", passed, failed, duration_ms);

        SuiteReport {
            total: scenarios.len(),
            passed,
            failed,
            duration_ms,
            reports,
        }
    }

    async fn execute_step(&mut self, index: usize, step: &ScenarioStep) -> HarnessResult<()> {
        match step {
            ScenarioStep::Navigate { path, wait_for } => {
                self.driver.navigate(path).await?;
                if let Some(selector) = wait_for {
                    self.driver.wait_for(selector, self.default_timeout_ms).await?;
                }
                Ok(())
            }
            ScenarioStep::Fill { selector, value } => self.driver.fill(selector, value).await,
            ScenarioStep::Click { selector, timeout_ms } => {
                let timeout = timeout_ms.unwrap_or(self.default_timeout_ms);
                self.driver.click(selector, timeout).await
            }
            ScenarioStep::Wait { selector, timeout_ms } => {
                let timeout = timeout_ms.unwrap_or(self.default_timeout_ms);
                self.driver.wait_for(selector, timeout).await.map(|_| ())
            }
            ScenarioStep::Assert { selector, visible, text, text_contains, count } => {
                self.execute_assert(index, selector, *visible, text.as_deref(), text_contains.as_deref(), *count)
                    .await
            }
            ScenarioStep::Log { message } => {
                info!("[scenario] {}", message);
                Ok(())
            }
        }
    }

    async fn execute_assert(
        &mut self,
        step_index: usize,
        selector: &Selector,
        visible: Option<bool>,
        text: Option<&str>,
        text_contains: Option<&str>,
        count: Option<usize>,
    ) -> HarnessResult<()> {
        if let Some(expected_visible) = visible {
            let found = match self.driver.wait_for(selector, self.default_timeout_ms).await {
                Ok(_) => true,
                Err(HarnessError::ElementNotFound { .. }) => false,
                Err(e) => return Err(e),
            };
            if found != expected_visible {
                return Err(HarnessError::Assertion {
                    expected: format!("visible={expected_visible}"),
                    actual: format!("visible={found}"),
                    step_index,
                });
            }
        }

        if text.is_some() || text_contains.is_some() {
            let actual = self.driver.text_of(selector, self.default_timeout_ms).await?;
            if let Some(expected) = text {
                if actual.trim() != expected {
                    return Err(HarnessError::Assertion {
                        expected: expected.to_string(),
                        actual,
                        step_index,
                    });
                }
            }
            if let Some(fragment) = text_contains {
                if !actual.contains(fragment) {
                    return Err(HarnessError::Assertion {
                        expected: format!("text containing {fragment:?}"),
                        actual,
                        step_index,
                    });
                }
            }
        }

        if let Some(expected_count) = count {
            let actual_count = self.driver.count_of(selector).await?;
            if actual_count != expected_count {
                return Err(HarnessError::Assertion {
                    expected: format!("count={expected_count}"),
                    actual: format!("count={actual_count}"),
                    step_index,
                });
            }
        }

        Ok(())
    }
}

fn phase_of(step: &ScenarioStep) -> Phase {
    match step {
        ScenarioStep::Navigate { .. } => Phase::Navigating,
        ScenarioStep::Assert { .. } => Phase::Asserting,
        _ => Phase::Interacting,
    }
}
