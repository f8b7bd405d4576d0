//! Main test runner that opens a session per scenario and reconciles totals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::HarnessConfig;
use crate::driver::SessionFactory;
use crate::error::{E2eError, E2eResult};
use crate::page::{CartSelectors, ShoppingCartPage};
use crate::scenario::{Reconciliation, ScenarioExecution};
use crate::spec::TestSpec;

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub reconciliations: Vec<Reconciliation>,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

impl TestResult {
    fn failed(name: &str, started_at: DateTime<Utc>, error: &E2eError) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            started_at,
            duration_ms: 0,
            steps: vec![],
            reconciliations: vec![],
            error: Some(error.to_string()),
            screenshot_path: None,
        }
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(results: Vec<TestResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            skipped: 0,
            duration_ms,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Runs cart scenarios, one isolated browser session each
pub struct TestRunner<F: SessionFactory> {
    factory: F,
    selectors: CartSelectors,
    specs_dir: PathBuf,
    output_dir: PathBuf,
    /// Where failure screenshots go; None disables them
    screenshot_dir: Option<PathBuf>,
}

impl<F: SessionFactory> TestRunner<F> {
    pub fn new(factory: F, config: &HarnessConfig) -> Self {
        Self {
            factory,
            selectors: config.selectors.clone(),
            specs_dir: config.specs_dir.clone(),
            output_dir: config.output_dir.clone(),
            screenshot_dir: Some(config.playwright.screenshot_dir.clone()),
        }
    }

    pub fn without_screenshots(mut self) -> Self {
        self.screenshot_dir = None;
        self
    }

    /// Run all scenarios in the specs directory
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.specs_dir)?;
        if specs.is_empty() {
            return Err(E2eError::NoScenarios(format!(
                "no scenario files in {}",
                self.specs_dir.display()
            )));
        }
        Ok(self.run_specs(&specs).await)
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.specs_dir)?;
        let filtered: Vec<TestSpec> = TestSpec::filter_by_tag(&specs, tag)
            .into_iter()
            .cloned()
            .collect();
        if filtered.is_empty() {
            return Err(E2eError::NoScenarios(format!("no scenario tagged '{}'", tag)));
        }
        Ok(self.run_specs(&filtered).await)
    }

    /// Run a specific scenario by name
    pub async fn run_test(&self, name: &str) -> E2eResult<TestResult> {
        let specs = TestSpec::load_all(&self.specs_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioNotFound(name.to_string()))?;

        Ok(self.run_spec(&spec).await)
    }

    /// Run a list of scenarios in order. Failures do not stop the suite.
    pub async fn run_specs(&self, specs: &[TestSpec]) -> TestSuiteResult {
        let start = Instant::now();
        let mut results = Vec::with_capacity(specs.len());

        info!("Running {} scenario(s)...", specs.len());

        for spec in specs {
            let result = self.run_spec(spec).await;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let suite = TestSuiteResult::from_results(results, start.elapsed().as_millis() as u64);

        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );

        suite
    }

    /// Run a single scenario
    pub async fn run_spec(&self, spec: &TestSpec) -> TestResult {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!("Running scenario: {}", spec.name);

        let driver = match self.factory.open_session(spec).await {
            Ok(driver) => driver,
            Err(e) => return TestResult::failed(&spec.name, started_at, &e),
        };
        let page = ShoppingCartPage::new(driver, self.factory.url_for(&spec.path), self.selectors.clone());

        let mut steps = Vec::new();
        let mut reconciliations = Vec::new();

        let (started, navigate) =
            timed("navigate", ScenarioExecution::start(page, spec.items.clone())).await;
        steps.push(navigate);
        let mut execution = match started {
            Ok(execution) => execution,
            Err(e) => {
                let mut result = TestResult::failed(&spec.name, started_at, &e);
                result.steps = steps;
                result.duration_ms = start.elapsed().as_millis() as u64;
                return result;
            }
        };

        let mut test_error = None;
        for step in &spec.steps {
            let (outcome, step_result) = timed(&step.label(), execution.run_step(step)).await;
            steps.push(step_result);
            match outcome {
                Ok(Some(reconciliation)) => reconciliations.push(reconciliation),
                Ok(None) => {}
                Err(e) => {
                    test_error = Some(e);
                    break; // Stop on first failure
                }
            }
        }

        if test_error.is_none() && !execution.phase().is_terminal() {
            let (outcome, step_result) = timed("verify (implicit)", execution.verify()).await;
            steps.push(step_result);
            match outcome {
                Ok(reconciliation) => reconciliations.push(reconciliation),
                Err(e) => test_error = Some(e),
            }
        }

        let mut screenshot_path = None;
        if test_error.is_some() {
            if let Some(dir) = &self.screenshot_dir {
                let path = failure_screenshot_path(dir, &spec.name);
                match execution.screenshot(&path).await {
                    Ok(true) => screenshot_path = Some(path),
                    Ok(false) => {}
                    Err(e) => warn!("Could not capture failure screenshot: {}", e),
                }
            }
        }

        if let Err(e) = execution.finish().await {
            warn!("Closing session for {} failed: {}", spec.name, e);
        }

        TestResult {
            name: spec.name.clone(),
            success: test_error.is_none(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            reconciliations,
            error: test_error.map(|e| e.to_string()),
            screenshot_path,
        }
    }

    /// Write results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

async fn timed<T>(
    step_name: &str,
    fut: impl Future<Output = E2eResult<T>>,
) -> (E2eResult<T>, StepResult) {
    let start = Instant::now();
    let outcome = fut.await;
    let step = StepResult {
        success: outcome.is_ok(),
        step_name: step_name.to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
        error: outcome.as_ref().err().map(|e| e.to_string()),
    };
    (outcome, step)
}

fn failure_screenshot_path(dir: &Path, scenario: &str) -> PathBuf {
    let file: String = scenario
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("{}-failure.png", file))
}
