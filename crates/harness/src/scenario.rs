//! Declarative YAML scenario specification

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HarnessResult;

/// Articles per feed page in the application under test
pub const PAGE_SIZE: usize = 10;

/// Number of pages the feed renders for `article_count` articles.
///
/// At exactly one page of articles no pagination control appears; one more
/// article produces a second page.
pub fn expected_page_count(article_count: usize) -> usize {
    article_count.div_ceil(PAGE_SIZE).max(1)
}

/// An element selector: a single query or a prioritized list of
/// alternatives. Lookup succeeds on the first candidate that matches, which
/// tolerates minor markup drift without rewriting every scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    One(String),
    Any(Vec<String>),
}

impl Selector {
    pub fn candidates(&self) -> &[String] {
        match self {
            Selector::One(s) => std::slice::from_ref(s),
            Selector::Any(list) => list,
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Selector::One(s.to_string())
    }
}

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<ScenarioStep>,
}

/// A single ordered action within a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Navigate to a UI path (relative to the UI base URL)
    Navigate {
        path: String,
        #[serde(default)]
        wait_for: Option<Selector>,
    },

    /// Fill an input field
    Fill {
        selector: Selector,
        value: String,
    },

    /// Click an element
    Click {
        selector: Selector,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for an element to appear within a bounded interval
    Wait {
        selector: Selector,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Assert something about an element. Failure halts the scenario.
    Assert {
        selector: Selector,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        count: Option<usize>,
    },

    /// Log a message (for diagnostics)
    Log {
        message: String,
    },
}

impl ScenarioStep {
    /// Short label used in reports and failure diagnostics
    pub fn label(&self) -> String {
        fn first(selector: &Selector) -> &str {
            selector.candidates().first().map(String::as_str).unwrap_or("<empty>")
        }

        match self {
            ScenarioStep::Navigate { path, .. } => format!("navigate:{path}"),
            ScenarioStep::Fill { selector, .. } => format!("fill:{}", first(selector)),
            ScenarioStep::Click { selector, .. } => format!("click:{}", first(selector)),
            ScenarioStep::Wait { selector, .. } => format!("wait:{}", first(selector)),
            ScenarioStep::Assert { selector, .. } => format!("assert:{}", first(selector)),
            ScenarioStep::Log { message } => {
                // Truncate on a char boundary; byte slicing would panic on
                // multi-byte input.
                let cut = message
                    .char_indices()
                    .nth(30)
                    .map_or(message.as_str(), |(i, _)| &message[..i]);
                format!("log:{cut}")
            }
        }
    }
}

impl Scenario {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all scenarios under a directory, sorted by file name
    pub fn load_all(dir: &Path) -> HarnessResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }
}
