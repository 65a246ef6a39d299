//! Host facts reported alongside an update: public IP and running commit.
//! Both degrade to `"unknown"` instead of failing.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tracing::debug;

use crate::types::IpLookup;

pub const UNKNOWN: &str = "unknown";

pub struct HostInfo {
    http: reqwest::Client,
    ip_lookup_url: String,
    source_dir: PathBuf,
    timeout: Duration,
}

impl HostInfo {
    pub fn new(
        ip_lookup_url: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            ip_lookup_url: ip_lookup_url.into(),
            source_dir: source_dir.into(),
            timeout,
        })
    }

    /// Public IP as seen by the lookup service
    pub async fn public_ip(&self) -> String {
        match self.lookup_ip().await {
            Ok(ip) if !ip.is_empty() => ip,
            Ok(_) => UNKNOWN.to_string(),
            Err(e) => {
                debug!("IP lookup failed: {}", e);
                UNKNOWN.to_string()
            }
        }
    }

    async fn lookup_ip(&self) -> Result<String, reqwest::Error> {
        let lookup: IpLookup = self
            .http
            .get(&self.ip_lookup_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(lookup.ip)
    }

    /// `git rev-parse HEAD` in the source checkout
    pub async fn commit_hash(&self) -> String {
        let output = tokio::process::Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&self.source_dir)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(out)) if out.status.success() => {
                let hash = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if hash.is_empty() {
                    UNKNOWN.to_string()
                } else {
                    hash
                }
            }
            Ok(Ok(out)) => {
                debug!("git rev-parse exited with {}", out.status);
                UNKNOWN.to_string()
            }
            Ok(Err(e)) => {
                debug!("git rev-parse failed: {}", e);
                UNKNOWN.to_string()
            }
            Err(_) => UNKNOWN.to_string(),
        }
    }
}
