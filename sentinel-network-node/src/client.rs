use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::api::NodeApi;
use crate::endpoint::HttpEndpoint;
use crate::models::{Address, Block, Candidate, Status, TxOutcome};
use crate::{Error, Result};

/// Failover client over interchangeable node endpoints.
///
/// Every call walks the endpoints from the first one. A transport failure
/// moves on to the next endpoint; any other answer, including application
/// errors and `BlockNotFound`, is returned as is.
pub struct NodeClient {
    endpoints: Vec<Arc<dyn NodeApi>>,
    current: AtomicUsize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointHealth {
    Healthy { url: String, height: u64 },
    CatchingUp { url: String, height: u64 },
    Unreachable { url: String, reason: String },
}

impl EndpointHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, EndpointHealth::Healthy { .. })
    }
}

impl NodeClient {
    pub fn new(endpoints: Vec<Arc<dyn NodeApi>>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        Ok(Self {
            endpoints,
            current: AtomicUsize::new(0),
        })
    }

    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> Result<Self> {
        let endpoints = urls
            .iter()
            .map(|url| HttpEndpoint::new(url.as_ref()).map(|e| Arc::new(e) as Arc<dyn NodeApi>))
            .collect::<Result<Vec<_>>>()?;
        Self::new(endpoints)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Index of the endpoint that answered the latest call.
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// Asks every endpoint for `status()` once.
    pub async fn ping(&self) -> Vec<EndpointHealth> {
        let mut health = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let url = endpoint.url().to_string();
            let state = match endpoint.status().await {
                Ok(status) if status.catching_up => {
                    log::warn!("node {} is catching up at height {}", url, status.latest_height);
                    EndpointHealth::CatchingUp {
                        url,
                        height: status.latest_height,
                    }
                }
                Ok(status) => {
                    log::info!("node {} is at height {}", url, status.latest_height);
                    EndpointHealth::Healthy {
                        url,
                        height: status.latest_height,
                    }
                }
                Err(err) => {
                    log::warn!("node {} is not available: {}", url, err);
                    EndpointHealth::Unreachable {
                        url,
                        reason: err.to_string(),
                    }
                }
            };
            health.push(state);
        }
        health
    }

    async fn try_each<T, F, Fut>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Fn(Arc<dyn NodeApi>) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let mut last_error = None;
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            match call(endpoint.clone()).await {
                Err(err) if err.is_transport() => {
                    log::warn!("{} via {} failed: {}", operation, endpoint.url(), err);
                    last_error = Some(err);
                }
                result => {
                    self.current.store(index, Ordering::Relaxed);
                    log::debug!("{} answered by {}", operation, endpoint.url());
                    return result;
                }
            }
        }
        Err(last_error.unwrap_or(Error::NoEndpoints))
    }
}

#[async_trait]
impl NodeApi for NodeClient {
    fn url(&self) -> &str {
        self.endpoints[self.current_index()].url()
    }

    async fn status(&self) -> Result<Status> {
        self.try_each("status", |node| async move { node.status().await })
            .await
    }

    async fn block(&self, height: u64) -> Result<Block> {
        self.try_each("block", move |node| async move { node.block(height).await })
            .await
    }

    async fn candidate(&self, public_key: &str) -> Result<Candidate> {
        self.try_each("candidate", |node| {
            let public_key = public_key.to_string();
            async move { node.candidate(&public_key).await }
        })
        .await
    }

    async fn address(&self, address: &str) -> Result<Address> {
        self.try_each("address", |node| {
            let address = address.to_string();
            async move { node.address(&address).await }
        })
        .await
    }

    async fn send_transaction(&self, tx: &str) -> Result<TxOutcome> {
        self.try_each("send_transaction", |node| {
            let tx = tx.to_string();
            async move { node.send_transaction(&tx).await }
        })
        .await
    }
}
