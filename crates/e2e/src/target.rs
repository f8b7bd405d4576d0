//! The storefront under test - an external URL or a staged local build

use serde::{Deserialize, Serialize};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// How to reach the storefront
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Shell command serving a staged build. `PORT` is set in its
    /// environment and the base URL becomes `http://127.0.0.1:$PORT`.
    pub serve_command: Option<String>,

    /// Port for the staged build (None = find free port)
    pub port: Option<u16>,

    /// Poll the base URL until it answers before running scenarios
    pub health_check: bool,

    /// Path polled during the health check
    pub health_path: String,

    /// Timeout for startup and the health check, in seconds
    pub startup_timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            serve_command: None,
            port: None,
            health_check: true,
            health_path: "/".to_string(),
            startup_timeout_secs: 30,
        }
    }
}

/// A reachable storefront. Owns the staged server process if one was spawned.
pub struct TargetSite {
    child: Option<Child>,
    base_url: String,
}

impl TargetSite {
    /// Spawn the staged build if configured, otherwise use `base_url`, then
    /// wait for it to respond.
    pub async fn prepare(config: &TargetConfig, base_url: &str) -> E2eResult<Self> {
        let site = match &config.serve_command {
            Some(command) => Self::spawn(command, config.port)?,
            None => Self {
                child: None,
                base_url: base_url.trim_end_matches('/').to_string(),
            },
        };

        if config.health_check {
            let url = format!("{}{}", site.base_url, config.health_path);
            wait_for_healthy(&url, Duration::from_secs(config.startup_timeout_secs)).await?;
            info!("Storefront is up at {}", site.base_url);
        }

        Ok(site)
    }

    fn spawn(command: &str, port: Option<u16>) -> E2eResult<Self> {
        let port = match port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("Serving staged storefront on port {}: {}", port, command);

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .env("PORT", port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| E2eError::TargetStartup(format!("Failed to spawn '{}': {}", command, e)))?;

        Ok(Self {
            child: Some(child),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the staged server, if any
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        info!("Stopping staged storefront (pid: {})", child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = child.kill();
        let _ = child.wait();
        Ok(())
    }
}

impl Drop for TargetSite {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Poll `url` until it returns a success status or `timeout_duration` passes.
pub async fn wait_for_healthy(url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => warn!("Health check returned {}", resp.status()),
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} ...", url);
                }
                // Connection refused is expected while a staged build starts
                if !e.is_connect() {
                    warn!("Health check error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(100)).await;
    }

    Err(E2eError::TargetHealthCheck(attempts))
}

fn find_free_port() -> E2eResult<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_port() {
        let port = find_free_port().unwrap();
        assert!(port > 1024);
    }

    #[tokio::test]
    async fn test_external_target_without_health_check() {
        let config = TargetConfig {
            health_check: false,
            ..Default::default()
        };
        let site = TargetSite::prepare(&config, "https://shop.test/").await.unwrap();
        assert_eq!(site.base_url(), "https://shop.test");
    }

    #[tokio::test]
    async fn test_health_check_gives_up() {
        let port = find_free_port().unwrap();
        let url = format!("http://127.0.0.1:{}/", port);
        let err = wait_for_healthy(&url, Duration::from_millis(300)).await.unwrap_err();
        assert!(matches!(err, E2eError::TargetHealthCheck(n) if n >= 1));
    }
}
