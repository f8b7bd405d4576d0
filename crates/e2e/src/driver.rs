//! Browser automation capability surface
//!
//! Everything the page adapter needs from a browser goes through
//! [`BrowserDriver`]. Implementations: [`crate::playwright::PlaywrightSession`]
//! for real browsers and [`crate::simulator::SimulatedStorefront`] for
//! in-process runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::E2eResult;
use crate::spec::TestSpec;

/// A chain of CSS selectors, each scoped inside the previous match
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator {
    segments: Vec<String>,
}

impl Locator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            segments: vec![selector.into()],
        }
    }

    /// Narrow this locator to `selector` inside its match.
    pub fn locate(&self, selector: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(selector.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(" >> "))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

/// One browser page. Calls resolve only after the browser has settled the
/// action (or timed out), so callers can issue them strictly in sequence.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn navigate(&mut self, url: &str) -> E2eResult<()>;

    async fn click(&mut self, locator: &Locator) -> E2eResult<()>;

    async fn fill(&mut self, locator: &Locator, text: &str) -> E2eResult<()>;

    async fn clear(&mut self, locator: &Locator) -> E2eResult<()>;

    /// Text content of the first match; `None` when the element has none.
    async fn read_text(&mut self, locator: &Locator) -> E2eResult<Option<String>>;

    async fn wait_for(&mut self, locator: &Locator, state: WaitState) -> E2eResult<()>;

    /// Wait until the element's enabled state equals `enabled`.
    async fn expect_enabled(&mut self, locator: &Locator, enabled: bool) -> E2eResult<()>;

    /// Capture the page. Drivers without a rendering surface return `Ok(false)`.
    async fn screenshot(&mut self, _path: &Path) -> E2eResult<bool> {
        Ok(false)
    }

    async fn close(&mut self) -> E2eResult<()> {
        Ok(())
    }
}

/// Opens one isolated browser session per scenario
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Driver: BrowserDriver;

    async fn open_session(&self, spec: &TestSpec) -> E2eResult<Self::Driver>;

    /// Absolute URL for a scenario path.
    fn url_for(&self, path: &str) -> String;
}

/// Join a base URL and a scenario path without doubling slashes.
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_chains_segments() {
        let modal = Locator::new("#remove-confirm-modal");
        let confirm = modal.locate("button.confirm-remove");
        assert_eq!(confirm.segments().len(), 2);
        assert_eq!(modal.segments().len(), 1);
        assert_eq!(confirm.to_string(), "#remove-confirm-modal >> button.confirm-remove");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://shop.test/", "/#"), "https://shop.test/#");
        assert_eq!(join_url("https://shop.test", "cart"), "https://shop.test/cart");
        assert_eq!(join_url("https://shop.test/", ""), "https://shop.test");
        assert_eq!(join_url("https://shop.test", "http://other.test/"), "http://other.test/");
    }
}
