//! Playwright browser automation
//!
//! Each session is a `node` subprocess running a small driver script that
//! keeps one Playwright page open and answers JSON-line commands on stdin.
//! Replies come back one per line on stdout, tagged with the request id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::driver::{join_url, BrowserDriver, Locator, SessionFactory, WaitState};
use crate::error::{E2eError, E2eResult};
use crate::spec::TestSpec;

/// Driver script run by `node`. Options arrive as JSON in argv[2].
const DRIVER_SCRIPT: &str = r#"
const playwright = require('playwright');
const readline = require('readline');

const options = JSON.parse(process.argv[2]);

function send(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

function locate(page, segments) {
  return segments.reduce((scope, selector) => scope.locator(selector), page);
}

async function expectEnabled(locator, enabled, timeout) {
  const deadline = Date.now() + timeout;
  for (;;) {
    let actual;
    try {
      actual = await locator.isEnabled({ timeout: Math.max(100, deadline - Date.now()) });
    } catch (error) {
      if (Date.now() >= deadline) throw error;
    }
    if (actual === enabled) return true;
    if (Date.now() >= deadline) {
      throw new Error(`Timeout ${timeout}ms exceeded waiting for element to be ${enabled ? 'enabled' : 'disabled'}`);
    }
    await new Promise((resolve) => setTimeout(resolve, 100));
  }
}

const handlers = {
  navigate: async (page, cmd) => { await page.goto(cmd.url); return null; },
  click: async (page, cmd) => { await locate(page, cmd.locator).click(); return null; },
  fill: async (page, cmd) => { await locate(page, cmd.locator).fill(cmd.text); return null; },
  clear: async (page, cmd) => { await locate(page, cmd.locator).clear(); return null; },
  text: async (page, cmd) => locate(page, cmd.locator).textContent(),
  wait: async (page, cmd) => { await locate(page, cmd.locator).waitFor({ state: cmd.state }); return null; },
  expect_enabled: async (page, cmd) => expectEnabled(locate(page, cmd.locator), cmd.enabled, options.timeout_ms),
  screenshot: async (page, cmd) => { await page.screenshot({ path: cmd.path, fullPage: true }); return true; },
  close: async () => null,
};

(async () => {
  const browser = await playwright[options.browser].launch({ headless: options.headless });
  const context = await browser.newContext({
    viewport: { width: options.viewport_width, height: options.viewport_height },
  });
  const page = await context.newPage();
  page.setDefaultTimeout(options.timeout_ms);
  send({ ready: true });

  const input = readline.createInterface({ input: process.stdin });
  for await (const line of input) {
    if (!line.trim()) continue;
    let cmd;
    try {
      cmd = JSON.parse(line);
    } catch (error) {
      send({ id: null, ok: false, error: `bad request: ${error.message}` });
      continue;
    }
    const handler = handlers[cmd.op];
    if (!handler) {
      send({ id: cmd.id, ok: false, error: `unknown op: ${cmd.op}` });
      continue;
    }
    try {
      const value = await handler(page, cmd);
      send({ id: cmd.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      send({ id: cmd.id, ok: false, error: error.message });
    }
    if (cmd.op === 'close') break;
  }
  await browser.close();
})().catch((error) => {
  send({ ready: false, error: error.message });
  process.exit(1);
});
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::InvalidConfig(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Per-action timeout handed to Playwright
    pub timeout_ms: u64,

    /// How long to wait for the browser to come up
    pub launch_timeout_ms: u64,

    /// Where failure screenshots go
    pub screenshot_dir: PathBuf,

    /// `node_modules` directory that provides `playwright`
    /// (defaults to `./node_modules`)
    pub node_modules: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gb-saa-test.vercel.app".to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            timeout_ms: 5000,
            launch_timeout_ms: 30_000,
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            node_modules: None,
        }
    }
}

#[derive(Serialize)]
struct DriverOptions<'a> {
    browser: &'a str,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DriverCommand<'a> {
    Navigate { url: &'a str },
    Click { locator: &'a Locator },
    Fill { locator: &'a Locator, text: &'a str },
    Clear { locator: &'a Locator },
    Text { locator: &'a Locator },
    Wait { locator: &'a Locator, state: WaitState },
    ExpectEnabled { locator: &'a Locator, enabled: bool },
    Screenshot { path: &'a Path },
    Close,
}

impl DriverCommand<'_> {
    fn describe(&self) -> String {
        match self {
            DriverCommand::Navigate { url } => format!("navigate:{}", url),
            DriverCommand::Click { locator } => format!("click:{}", locator),
            DriverCommand::Fill { locator, .. } => format!("fill:{}", locator),
            DriverCommand::Clear { locator } => format!("clear:{}", locator),
            DriverCommand::Text { locator } => format!("text:{}", locator),
            DriverCommand::Wait { locator, state } => format!("wait_{}:{}", state.as_str(), locator),
            DriverCommand::ExpectEnabled { locator, enabled } => {
                format!("expect_{}:{}", if *enabled { "enabled" } else { "disabled" }, locator)
            }
            DriverCommand::Screenshot { path } => format!("screenshot:{}", path.display()),
            DriverCommand::Close => "close".to_string(),
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a DriverCommand<'a>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Ready {
    ready: bool,
    #[serde(default)]
    error: Option<String>,
}

/// A live Playwright page
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    reply_timeout: Duration,
    closed: bool,
    // Holds the driver script on disk for the life of the process
    _script_dir: tempfile::TempDir,
}

impl PlaywrightSession {
    /// Launch a browser and wait for the driver to report ready.
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("cart-driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let options = serde_json::to_string(&DriverOptions {
            browser: config.browser.as_str(),
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            timeout_ms: config.timeout_ms,
        })?;

        let node_modules = match &config.node_modules {
            Some(path) => path.clone(),
            None => std::env::current_dir()?.join("node_modules"),
        };

        debug!("Launching {} via {}", config.browser.as_str(), script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .arg(&options)
            .env("NODE_PATH", &node_modules)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Protocol("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Protocol("driver stdout unavailable".to_string()))?;

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            reply_timeout: Duration::from_millis(config.timeout_ms.saturating_mul(2).max(1000)),
            closed: false,
            _script_dir: script_dir,
        };

        let launch_timeout = Duration::from_millis(config.launch_timeout_ms);
        tokio::time::timeout(launch_timeout, session.wait_ready())
            .await
            .map_err(|_| E2eError::Timeout(format!("{} to launch", config.browser.as_str())))??;

        info!("{} session ready", config.browser.as_str());
        Ok(session)
    }

    async fn wait_ready(&mut self) -> E2eResult<()> {
        loop {
            let line = self.next_line().await?;
            match serde_json::from_str::<Ready>(&line) {
                Ok(Ready { ready: true, .. }) => return Ok(()),
                Ok(Ready { error, .. }) => {
                    return Err(E2eError::Playwright(
                        error.unwrap_or_else(|| "browser failed to launch".to_string()),
                    ))
                }
                Err(_) => debug!("driver: {}", line),
            }
        }
    }

    async fn next_line(&mut self) -> E2eResult<String> {
        self.stdout
            .next_line()
            .await?
            .ok_or_else(|| E2eError::Protocol("driver exited unexpectedly".to_string()))
    }

    async fn request(&mut self, command: DriverCommand<'_>) -> E2eResult<serde_json::Value> {
        if self.closed {
            return Err(E2eError::Protocol("session is closed".to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;
        let description = command.describe();
        debug!("-> [{}] {}", id, description);

        let mut line = serde_json::to_string(&Request { id, command: &command })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let reply = tokio::time::timeout(self.reply_timeout, self.read_reply(id))
            .await
            .map_err(|_| E2eError::Timeout(description.clone()))??;

        if reply.ok {
            Ok(reply.value)
        } else {
            let message = reply.error.unwrap_or_else(|| "unknown driver error".to_string());
            if message.contains("Timeout") {
                Err(E2eError::Timeout(format!("{}: {}", description, message)))
            } else {
                Err(E2eError::StepFailed {
                    step: description,
                    reason: message,
                })
            }
        }
    }

    async fn read_reply(&mut self, id: u64) -> E2eResult<Reply> {
        loop {
            let line = self.next_line().await?;
            match serde_json::from_str::<Reply>(&line) {
                Ok(reply) if reply.id == Some(id) => return Ok(reply),
                Ok(reply) if reply.id.is_none() && !reply.ok => {
                    return Err(E2eError::Protocol(
                        reply.error.unwrap_or_else(|| "malformed request".to_string()),
                    ))
                }
                Ok(reply) => warn!("Dropping stale driver reply {:?}", reply.id),
                Err(_) => debug!("driver: {}", line),
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightSession {
    async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        self.request(DriverCommand::Navigate { url }).await.map(|_| ())
    }

    async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        self.request(DriverCommand::Click { locator }).await.map(|_| ())
    }

    async fn fill(&mut self, locator: &Locator, text: &str) -> E2eResult<()> {
        self.request(DriverCommand::Fill { locator, text }).await.map(|_| ())
    }

    async fn clear(&mut self, locator: &Locator) -> E2eResult<()> {
        self.request(DriverCommand::Clear { locator }).await.map(|_| ())
    }

    async fn read_text(&mut self, locator: &Locator) -> E2eResult<Option<String>> {
        let value = self.request(DriverCommand::Text { locator }).await?;
        Ok(value.as_str().map(String::from))
    }

    async fn wait_for(&mut self, locator: &Locator, state: WaitState) -> E2eResult<()> {
        self.request(DriverCommand::Wait { locator, state }).await.map(|_| ())
    }

    async fn expect_enabled(&mut self, locator: &Locator, enabled: bool) -> E2eResult<()> {
        self.request(DriverCommand::ExpectEnabled { locator, enabled })
            .await
            .map(|_| ())
            .map_err(|e| match e {
                E2eError::Timeout(detail) => E2eError::AssertionFailed(detail),
                other => other,
            })
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<bool> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.request(DriverCommand::Screenshot { path }).await?;
        Ok(true)
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        self.request(DriverCommand::Close).await?;
        self.closed = true;
        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(status) => debug!("Driver exited with {}", status?),
            Err(_) => {
                warn!("Driver did not exit after close; killing it");
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}

/// Launches one Playwright session per scenario
#[derive(Debug, Clone)]
pub struct PlaywrightSessionFactory {
    config: PlaywrightConfig,
}

impl PlaywrightSessionFactory {
    /// Verify Playwright is installed and prepare the screenshot directory.
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        std::fs::create_dir_all(&config.screenshot_dir)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }
}

#[async_trait]
impl SessionFactory for PlaywrightSessionFactory {
    type Driver = PlaywrightSession;

    async fn open_session(&self, spec: &TestSpec) -> E2eResult<Self::Driver> {
        debug!("Opening browser session for {}", spec.name);
        PlaywrightSession::launch(&self.config).await
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }
}
