use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::errors::AppResult;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Considers the network reachable when the target answers with any HTTP response.
pub struct HttpReachabilityProbe {
    client: Client,
    url: String,
}

impl HttpReachabilityProbe {
    pub fn new(url: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(PROBE_TIMEOUT).build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpReachabilityProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(response) => {
                log::debug!("Reachability probe {} -> {}", self.url, response.status());
                true
            }
            Err(e) => {
                log::debug!("Reachability probe {} failed: {}", self.url, e);
                false
            }
        }
    }
}

/// Fixed answer that can be flipped at runtime.
#[derive(Debug)]
pub struct StaticReachability(AtomicBool);

impl StaticReachability {
    pub fn new(reachable: bool) -> Self {
        Self(AtomicBool::new(reachable))
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.0.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReachabilityProbe for StaticReachability {
    async fn is_reachable(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_reachability_can_flip() {
        let probe = StaticReachability::new(false);
        assert!(!probe.is_reachable().await);
        probe.set_reachable(true);
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_unroutable_target_is_unreachable() {
        let probe = HttpReachabilityProbe::new("http://127.0.0.1:9/").unwrap();
        assert!(!probe.is_reachable().await);
    }
}
