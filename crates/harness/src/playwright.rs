//! Playwright browser automation
//!
//! The driver generates a Node script and runs it with `node`, reading a
//! single JSON result line back from stdout. Each call replays the
//! scenario's action log in a fresh browser, so every step executes against
//! the state the preceding steps produced.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::runner::PageDriver;
use crate::scenario::Selector;

const VIEWPORT_WIDTH: u32 = 1280;
const VIEWPORT_HEIGHT: u32 = 720;

/// Browser-side result line
#[derive(Debug, Deserialize)]
struct ScriptResult {
    ok: bool,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Drives a Chromium page through generated Playwright scripts
pub struct PlaywrightDriver {
    ui_base_url: String,
    headless: bool,
    poll_interval_ms: u64,
    default_timeout_ms: u64,
    /// JS statements accumulated since the scenario started
    actions: Vec<String>,
}

impl PlaywrightDriver {
    pub fn new(config: &HarnessConfig) -> HarnessResult<Self> {
        Self::check_installed()?;

        Ok(Self {
            ui_base_url: config.ui_base_url.trim_end_matches('/').to_string(),
            headless: config.headless,
            poll_interval_ms: config.poll_interval_ms,
            default_timeout_ms: config.default_timeout_ms,
            actions: Vec::new(),
        })
    }

    fn check_installed() -> HarnessResult<()> {
        let status = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(HarnessError::DriverNotFound),
        }
    }

    /// Assemble the full script: helper, accumulated actions, one epilogue
    /// that prints the JSON result line.
    fn build_script(&self, epilogue: &str) -> String {
        let mut script = format!(
            r#"const {{ chromium }} = require('playwright');

async function firstMatch(page, selectors, timeoutMs) {{
  const deadline = Date.now() + timeoutMs;
  do {{
    for (const sel of selectors) {{
      const el = await page.$(sel);
      if (el && await el.isVisible()) return sel;
    }}
    await page.waitForTimeout({poll});
  }} while (Date.now() < deadline);
  return null;
}}

(async () => {{
  const browser = await chromium.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseUrl = '{base_url}';

  try {{
"#,
            poll = self.poll_interval_ms,
            headless = self.headless,
            width = VIEWPORT_WIDTH,
            height = VIEWPORT_HEIGHT,
            base_url = js_str(&self.ui_base_url),
        );

        for action in &self.actions {
            script.push_str("    ");
            script.push_str(action);
            script.push('\n');
        }

        script.push_str("    ");
        script.push_str(epilogue);
        script.push('\n');

        script.push_str(
            r#"  } catch (error) {
    console.log(JSON.stringify({ ok: false, error: error.message }));
    process.exit(1);
  } finally {
    await browser.close();
  }
})();
"#,
        );

        script
    }

    /// Run the accumulated actions plus `epilogue`, returning the epilogue's
    /// JSON value.
    async fn run(&self, epilogue: &str) -> HarnessResult<Option<serde_json::Value>> {
        let script = self.build_script(epilogue);
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        std::fs::write(&script_path, &script)?;

        debug!("Running Playwright script ({} action(s))", self.actions.len());

        let output = tokio::process::Command::new("node")
            .arg(&script_path)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let result_line = stdout
            .lines()
            .rev()
            .find(|line| line.trim_start().starts_with('{'))
            .ok_or_else(|| {
                let stderr = String::from_utf8_lossy(&output.stderr);
                HarnessError::Driver(format!(
                    "script produced no result line\nstdout: {stdout}\nstderr: {stderr}"
                ))
            })?;

        let result: ScriptResult = serde_json::from_str(result_line)?;
        if result.ok {
            Ok(result.value)
        } else {
            Err(HarnessError::Driver(
                result.error.unwrap_or_else(|| "unknown browser error".to_string()),
            ))
        }
    }

    /// Run with no query: just confirm the action log still executes.
    async fn run_actions(&self) -> HarnessResult<()> {
        self.run("console.log(JSON.stringify({ ok: true }));").await.map(|_| ())
    }

    fn candidates_js(selector: &Selector) -> String {
        let quoted: Vec<String> = selector
            .candidates()
            .iter()
            .map(|c| format!("'{}'", js_str(c)))
            .collect();
        format!("[{}]", quoted.join(", "))
    }
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn reset(&mut self) -> HarnessResult<()> {
        self.actions.clear();
        Ok(())
    }

    async fn navigate(&mut self, path: &str) -> HarnessResult<()> {
        self.actions
            .push(format!("await page.goto(baseUrl + '{}');", js_str(path)));
        self.run_actions().await
    }

    async fn wait_for(&mut self, selector: &Selector, timeout_ms: u64) -> HarnessResult<String> {
        let epilogue = format!(
            "const matched = await firstMatch(page, {}, {}); \
             console.log(JSON.stringify({{ ok: true, value: matched }}));",
            Self::candidates_js(selector),
            timeout_ms,
        );

        match self.run(&epilogue).await? {
            Some(serde_json::Value::String(matched)) => Ok(matched),
            _ => Err(HarnessError::ElementNotFound {
                selectors: selector.candidates().to_vec(),
                timeout_ms,
            }),
        }
    }

    async fn fill(&mut self, selector: &Selector, value: &str) -> HarnessResult<()> {
        let matched = self.wait_for(selector, self.default_timeout_ms).await?;
        self.actions.push(format!(
            "await page.fill('{}', '{}');",
            js_str(&matched),
            js_str(value)
        ));
        self.run_actions().await
    }

    async fn click(&mut self, selector: &Selector, timeout_ms: u64) -> HarnessResult<()> {
        let matched = self.wait_for(selector, timeout_ms).await?;
        self.actions.push(format!(
            "await page.click('{}', {{ timeout: {} }});",
            js_str(&matched),
            timeout_ms
        ));
        self.run_actions().await
    }

    async fn text_of(&mut self, selector: &Selector, timeout_ms: u64) -> HarnessResult<String> {
        let matched = self.wait_for(selector, timeout_ms).await?;
        let epilogue = format!(
            "const text = await page.textContent('{}'); \
             console.log(JSON.stringify({{ ok: true, value: text }}));",
            js_str(&matched),
        );

        match self.run(&epilogue).await? {
            Some(serde_json::Value::String(text)) => Ok(text),
            _ => Ok(String::new()),
        }
    }

    async fn count_of(&mut self, selector: &Selector) -> HarnessResult<usize> {
        let epilogue = format!(
            "let count = 0; \
             for (const sel of {}) {{ \
               const els = await page.$$(sel); \
               if (els.length > 0) {{ count = els.length; break; }} \
             }} \
             console.log(JSON.stringify({{ ok: true, value: count }}));",
            Self::candidates_js(selector),
        );

        match self.run(&epilogue).await? {
            Some(serde_json::Value::Number(n)) => Ok(n.as_u64().unwrap_or(0) as usize),
            _ => Ok(0),
        }
    }
}

/// Escape a Rust string for inclusion in single-quoted JS
pub(crate) fn js_str(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}
