//! Readiness polling for provisioned services

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// A network endpoint that answers once its service is up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Ready when a GET returns a success status
    Http(String),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Http(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("{endpoint} did not become ready within {}ms", timeout.as_millis())]
    Timeout { endpoint: String, timeout: Duration },
}

/// Seam for waiting on infrastructure
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Succeed on the first healthy response, fail once `timeout` has elapsed
    async fn wait_until_ready(&self, endpoint: &Endpoint, timeout: Duration) -> Result<(), ReadinessError>;
}

/// Polls an endpoint at a fixed interval
#[derive(Debug, Clone)]
pub struct HttpReadinessWaiter {
    client: reqwest::Client,
    interval: Duration,
}

impl Default for HttpReadinessWaiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl HttpReadinessWaiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    async fn check(&self, endpoint: &Endpoint) -> bool {
        match endpoint {
            Endpoint::Http(url) => {
                let request = self
                    .client
                    .get(url)
                    .timeout(self.interval.max(Duration::from_secs(1)));
                match request.send().await {
                    Ok(response) => response.status().is_success(),
                    Err(e) => {
                        debug!("{} not ready: {}", url, e);
                        false
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ReadinessProbe for HttpReadinessWaiter {
    async fn wait_until_ready(&self, endpoint: &Endpoint, timeout: Duration) -> Result<(), ReadinessError> {
        let poll = async {
            loop {
                if self.check(endpoint).await {
                    return;
                }
                tokio::time::sleep(self.interval).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ReadinessError::Timeout {
                endpoint: endpoint.to_string(),
                timeout,
            })?;
        debug!("{} is ready", endpoint);
        Ok(())
    }
}
