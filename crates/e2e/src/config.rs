//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::E2eResult;
use crate::page::CartSelectors;
use crate::playwright::PlaywrightConfig;
use crate::target::TargetConfig;

/// Overrides the storefront base URL
pub const BASE_URL_ENV: &str = "CART_E2E_BASE_URL";

/// Overrides the browser engine
pub const BROWSER_ENV: &str = "CART_E2E_BROWSER";

/// Top-level configuration, loaded from `cart-e2e.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory holding scenario YAML files
    pub specs_dir: PathBuf,

    /// Output directory for results
    pub output_dir: PathBuf,

    pub playwright: PlaywrightConfig,

    pub target: TargetConfig,

    pub selectors: CartSelectors,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from("crates/e2e/scenarios"),
            output_dir: PathBuf::from("test-results"),
            playwright: PlaywrightConfig::default(),
            target: TargetConfig::default(),
            selectors: CartSelectors::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file; a missing file means defaults.
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            debug!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `CART_E2E_*` environment overrides.
    pub fn apply_env(&mut self) -> E2eResult<()> {
        self.apply_overrides(
            std::env::var(BASE_URL_ENV).ok(),
            std::env::var(BROWSER_ENV).ok(),
        )
    }

    fn apply_overrides(&mut self, base_url: Option<String>, browser: Option<String>) -> E2eResult<()> {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.playwright.base_url = url;
        }
        if let Some(browser) = browser.filter(|b| !b.trim().is_empty()) {
            self.playwright.browser = browser.parse()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playwright::Browser;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.selectors, CartSelectors::default());
        assert_eq!(config.playwright.base_url, "https://gb-saa-test.vercel.app");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart-e2e.toml");
        std::fs::write(
            &path,
            r##"
specs_dir = "scenarios"

[playwright]
base_url = "http://127.0.0.1:4173"
browser = "firefox"
timeout_ms = 8000

[target]
serve_command = "npx vite preview --port $PORT"

[selectors]
cart_total = "[data-testid=cart-total]"
"##,
        )
        .unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.specs_dir, PathBuf::from("scenarios"));
        assert_eq!(config.playwright.browser, Browser::Firefox);
        assert_eq!(config.playwright.timeout_ms, 8000);
        assert!(config.playwright.headless);
        assert_eq!(config.selectors.cart_total, "[data-testid=cart-total]");
        assert_eq!(config.selectors.checkout_button, "#checkoutBtn");
        assert!(config.target.serve_command.is_some());
        assert!(config.target.health_check);
    }

    #[test]
    fn test_overrides() {
        let mut config = HarnessConfig::default();
        config
            .apply_overrides(Some("http://localhost:3000".to_string()), Some("webkit".to_string()))
            .unwrap();
        assert_eq!(config.playwright.base_url, "http://localhost:3000");
        assert_eq!(config.playwright.browser, Browser::Webkit);

        assert!(config.apply_overrides(None, Some("lynx".to_string())).is_err());
    }
}
