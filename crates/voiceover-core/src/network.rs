//! Network reachability probing.

use crate::error::{VoiceoverError, VoiceoverResult};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Answers "is the network usable right now?"
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Whether the remote side is reachable; failures count as unreachable
    async fn is_connected(&self) -> bool;
}

/// Probe that opens a TCP connection to a fixed `host:port`
#[derive(Debug, Clone)]
pub struct TcpProbe {
    target: String,
    timeout: Duration,
}

impl TcpProbe {
    /// Probe `target` (`host:port`)
    #[must_use]
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }

    /// Probe the host and port of `url`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or names no host
    pub fn from_url(url: &str, timeout: Duration) -> VoiceoverResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| VoiceoverError::configuration(format!("Invalid URL '{url}': {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| VoiceoverError::configuration(format!("URL '{url}' has no host")))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| VoiceoverError::configuration(format!("URL '{url}' has no port")))?;

        Ok(Self::new(format!("{host}:{port}"), timeout))
    }

    /// `host:port` being probed
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl NetworkProbe for TcpProbe {
    async fn is_connected(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.target)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Reachability probe to {} failed: {}", self.target, e);
                false
            }
            Err(_) => {
                debug!("Reachability probe to {} timed out", self.target);
                false
            }
        }
    }
}
