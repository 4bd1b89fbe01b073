//! Declarative load-scenario profiles
//!
//! The harness assembles stage ramps and threshold expressions and checks
//! engine-reported metrics against them. Running the ramp itself — virtual
//! user scheduling, metric aggregation — belongs to the external load
//! engine behind [`LoadEngine`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{HarnessError, HarnessResult};
use crate::playwright::js_str;

/// One ramp segment: hold or move toward `target_vus` over `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStage {
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub target_vus: u32,
}

impl LoadStage {
    pub fn new(duration: Duration, target_vus: u32) -> Self {
        Self { duration, target_vus }
    }
}

/// Pass/fail ceilings a profile declares for itself
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// 95th-percentile request latency ceiling, in milliseconds
    pub p95_latency_ms: f64,
    /// Maximum tolerated error rate, 0.0..=1.0
    pub max_error_rate: f64,
}

/// Metrics an engine reports back after a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Metrics {
    pub p95_latency_ms: f64,
    pub error_rate: f64,
    pub requests: u64,
}

/// Threshold verdict with human-readable violations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdReport {
    pub profile: String,
    pub passed: bool,
    pub violations: Vec<String>,
}

/// An ordered stage list plus thresholds, consumed once per load run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadProfile {
    pub name: String,
    pub stages: Vec<LoadStage>,
    pub thresholds: Thresholds,
}

/// External load-generation engine
#[async_trait]
pub trait LoadEngine {
    async fn run(&self, profile: &LoadProfile) -> HarnessResult<Metrics>;
}

impl LoadProfile {
    /// Single virtual user for ten seconds; a connectivity sanity check.
    pub fn smoke() -> Self {
        Self {
            name: "smoke".to_string(),
            stages: vec![LoadStage::new(Duration::from_secs(10), 1)],
            thresholds: Thresholds { p95_latency_ms: 1_000.0, max_error_rate: 0.01 },
        }
    }

    /// Stepped ramp 10 -> 20 -> 30 virtual users with holds between steps.
    pub fn stress() -> Self {
        let m = |mins: u64| Duration::from_secs(mins * 60);
        Self {
            name: "stress".to_string(),
            stages: vec![
                LoadStage::new(m(1), 10),
                LoadStage::new(m(2), 10),
                LoadStage::new(m(1), 20),
                LoadStage::new(m(2), 20),
                LoadStage::new(m(1), 30),
                LoadStage::new(m(2), 30),
                LoadStage::new(m(2), 0),
            ],
            thresholds: Thresholds { p95_latency_ms: 3_000.0, max_error_rate: 0.3 },
        }
    }

    /// Sudden 5 -> 50 -> 5 spike with a recovery period.
    pub fn spike() -> Self {
        let s = Duration::from_secs;
        Self {
            name: "spike".to_string(),
            stages: vec![
                LoadStage::new(s(30), 5),
                LoadStage::new(s(60), 5),
                LoadStage::new(s(30), 50),
                LoadStage::new(s(120), 50),
                LoadStage::new(s(30), 5),
                LoadStage::new(s(60), 5),
                LoadStage::new(s(30), 0),
            ],
            thresholds: Thresholds { p95_latency_ms: 3_000.0, max_error_rate: 0.1 },
        }
    }

    /// Sustained 10 virtual users for ten minutes.
    pub fn soak() -> Self {
        Self {
            name: "soak".to_string(),
            stages: vec![LoadStage::new(Duration::from_secs(600), 10)],
            thresholds: Thresholds { p95_latency_ms: 2_000.0, max_error_rate: 0.05 },
        }
    }

    /// Built-in profile by name
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "smoke" => Some(Self::smoke()),
            "stress" => Some(Self::stress()),
            "spike" => Some(Self::spike()),
            "soak" => Some(Self::soak()),
            _ => None,
        }
    }

    pub fn builtin_names() -> &'static [&'static str] {
        &["smoke", "stress", "spike", "soak"]
    }

    /// Stage list sanity: non-empty, every duration positive, error-rate
    /// ceiling within [0, 1]. Positive durations keep the time axis
    /// monotonic.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.stages.is_empty() {
            return Err(HarnessError::InvalidProfile(format!(
                "{}: no stages",
                self.name
            )));
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if stage.duration.is_zero() {
                return Err(HarnessError::InvalidProfile(format!(
                    "{}: stage {} has zero duration",
                    self.name, i
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.thresholds.max_error_rate) {
            return Err(HarnessError::InvalidProfile(format!(
                "{}: max_error_rate {} outside [0, 1]",
                self.name, self.thresholds.max_error_rate
            )));
        }
        if self.thresholds.p95_latency_ms <= 0.0 {
            return Err(HarnessError::InvalidProfile(format!(
                "{}: non-positive latency ceiling",
                self.name
            )));
        }
        Ok(())
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn peak_vus(&self) -> u32 {
        self.stages.iter().map(|s| s.target_vus).max().unwrap_or(0)
    }

    /// Check engine-reported metrics against this profile's thresholds.
    pub fn evaluate(&self, metrics: &Metrics) -> ThresholdReport {
        let mut violations = Vec::new();

        if metrics.p95_latency_ms > self.thresholds.p95_latency_ms {
            violations.push(format!(
                "p95 latency {:.0}ms exceeds ceiling {:.0}ms",
                metrics.p95_latency_ms, self.thresholds.p95_latency_ms
            ));
        }
        if metrics.error_rate > self.thresholds.max_error_rate {
            violations.push(format!(
                "error rate {:.3} exceeds ceiling {:.3}",
                metrics.error_rate, self.thresholds.max_error_rate
            ));
        }

        ThresholdReport {
            profile: self.name.clone(),
            passed: violations.is_empty(),
            violations,
        }
    }

    /// k6 `options` object for this profile
    pub fn to_k6_options(&self) -> serde_json::Value {
        let stages: Vec<serde_json::Value> = self
            .stages
            .iter()
            .map(|s| json!({ "duration": format!("{}s", s.duration.as_secs()), "target": s.target_vus }))
            .collect();

        json!({
            "stages": stages,
            "thresholds": {
                "http_req_duration": [format!("p(95)<{}", self.thresholds.p95_latency_ms as u64)],
                "http_req_failed": [format!("rate<{}", self.thresholds.max_error_rate)],
            }
        })
    }

    /// A complete k6 script for this profile.
    ///
    /// Setup logs in once and passes the token to iterations; the
    /// per-iteration body is stateless and issues a single `GET /articles`.
    pub fn to_k6_script(&self, api_base_url: &str, email: &str, password: &str) -> String {
        format!(
            r#"import http from 'k6/http';
import {{ check, sleep }} from 'k6';

const BASE_URL = '{base}';

export const options = {options};

export function setup() {{
  const loginRes = http.post(`${{BASE_URL}}/users/login`, JSON.stringify({{
    user: {{ email: '{email}', password: '{password}' }}
  }}), {{ headers: {{ 'Content-Type': 'application/json' }} }});

  return {{ token: loginRes.json('user.token') }};
}}

export default function (data) {{
  const response = http.get(`${{BASE_URL}}/articles`, {{
    headers: {{ 'Authorization': `Token ${{data.token}}` }}
  }});
  check(response, {{
    'articles status is 200': (r) => r.status === 200,
  }});
  sleep(1);
}}
"#,
            base = js_str(api_base_url.trim_end_matches('/')),
            options = serde_json::to_string_pretty(&self.to_k6_options())
                .expect("profile options serialize"),
            email = js_str(email),
            password = js_str(password),
        )
    }
}

mod duration_secs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spike_ramps_five_fifty_five() {
        let profile = LoadProfile::spike();
        profile.validate().unwrap();
        assert_eq!(profile.peak_vus(), 50);
        assert_eq!(profile.stages.first().unwrap().target_vus, 5);
        assert_eq!(profile.stages.last().unwrap().target_vus, 0);
    }

    #[test]
    fn soak_holds_ten_vus_for_ten_minutes() {
        let profile = LoadProfile::soak();
        profile.validate().unwrap();
        assert_eq!(profile.stages.len(), 1);
        assert_eq!(profile.peak_vus(), 10);
        assert_eq!(profile.total_duration(), Duration::from_secs(600));
    }

    #[test]
    fn empty_and_zero_duration_profiles_are_invalid() {
        let mut profile = LoadProfile::smoke();
        profile.stages.clear();
        assert!(matches!(profile.validate(), Err(HarnessError::InvalidProfile(_))));

        let mut profile = LoadProfile::smoke();
        profile.stages[0].duration = Duration::ZERO;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn error_rate_ceiling_must_be_a_rate() {
        let mut profile = LoadProfile::smoke();
        profile.thresholds.max_error_rate = 1.5;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn evaluate_flags_each_violation() {
        let profile = LoadProfile::soak();
        let healthy = Metrics { p95_latency_ms: 800.0, error_rate: 0.0, requests: 6000 };
        assert!(profile.evaluate(&healthy).passed);

        let slow_and_flaky = Metrics { p95_latency_ms: 4_000.0, error_rate: 0.2, requests: 6000 };
        let report = profile.evaluate(&slow_and_flaky);
        assert!(!report.passed);
        assert_eq!(report.violations.len(), 2);
        assert!(report.violations[0].contains("p95"));
    }

    #[test]
    fn spike_stays_under_declared_error_rate() {
        let profile = LoadProfile::spike();
        let observed = Metrics { p95_latency_ms: 2_500.0, error_rate: 0.08, requests: 25_000 };
        assert!(profile.evaluate(&observed).passed);

        let degraded = Metrics { p95_latency_ms: 2_500.0, error_rate: 0.12, requests: 25_000 };
        assert!(!profile.evaluate(&degraded).passed);
    }

    #[test]
    fn k6_options_shape() {
        let options = LoadProfile::stress().to_k6_options();
        let stages = options["stages"].as_array().unwrap();
        assert_eq!(stages.len(), 7);
        assert_eq!(stages[0]["duration"], "60s");
        assert_eq!(stages[0]["target"], 10);
        assert_eq!(
            options["thresholds"]["http_req_duration"][0],
            "p(95)<3000"
        );
        assert_eq!(options["thresholds"]["http_req_failed"][0], "rate<0.3");
    }

    #[test]
    fn k6_script_is_stateless_per_iteration() {
        let script = LoadProfile::spike().to_k6_script(
            "http://localhost:8081/api",
            "perf-test1@example.com",
            "PerfTest1234!",
        );
        assert!(script.contains("export function setup()"));
        assert!(script.contains("/users/login"));
        assert!(script.contains("export default function (data)"));
        assert!(script.contains("`${BASE_URL}/articles`"));
        // One HTTP call per iteration, token from setup, no mutable globals.
        assert!(!script.contains("let "));
    }

    #[test]
    fn k6_script_escapes_credentials() {
        let script = LoadProfile::smoke().to_k6_script(
            "http://localhost:8081/api",
            "perf-test1@example.com",
            "O'Brien's pa'ss",
        );
        assert!(script.contains("O\\'Brien\\'s pa\\'ss"));
        assert!(!script.contains("'O'Brien"));
    }

    #[test]
    fn profiles_round_trip_through_yaml() {
        let profile = LoadProfile::spike();
        let yaml = serde_yaml::to_string(&profile).unwrap();
        let back: LoadProfile = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.name, "spike");
        assert_eq!(back.stages, profile.stages);
    }
}
