//! Error types for cart E2E runs

use thiserror::Error;

use crate::cart::Money;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Target site failed to start: {0}")]
    TargetStartup(String),

    #[error("Target health check failed after {0} attempts")]
    TargetHealthCheck(usize),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("No scenarios selected: {0}")]
    NoScenarios(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Cart total mismatch: expected ${expected}, page shows ${observed}")]
    TotalMismatch { expected: Money, observed: Money },

    #[error("Invalid scenario transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unknown cart item: {0}")]
    UnknownItem(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
