use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sentinel_network_node::models::{Address, Block, BlockValidator, Candidate, Status, TxOutcome};
use sentinel_network_node::{EndpointHealth, Error, NodeApi, NodeClient, Result};

#[derive(Clone, Copy)]
enum Behaviour {
    Down,
    Up { height: u64 },
    NotYet,
    Rejecting,
    CatchingUp,
}

struct MockEndpoint {
    url: String,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl MockEndpoint {
    fn new(url: &str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Down => Err(Error::Transport {
                endpoint: self.url.clone(),
                reason: "connection refused".to_string(),
            }),
            Behaviour::Up { height } => Ok(height),
            Behaviour::CatchingUp => Ok(1),
            Behaviour::NotYet => Err(Error::BlockNotFound { height: 0 }),
            Behaviour::Rejecting => Err(Error::Application {
                code: 500,
                message: "internal".to_string(),
            }),
        }
    }
}

#[async_trait]
impl NodeApi for MockEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    async fn status(&self) -> Result<Status> {
        let height = self.hit()?;
        Ok(Status {
            latest_height: height,
            catching_up: matches!(self.behaviour, Behaviour::CatchingUp),
        })
    }

    async fn block(&self, height: u64) -> Result<Block> {
        match self.hit() {
            Err(Error::BlockNotFound { .. }) => Err(Error::BlockNotFound { height }),
            other => other.map(|_| Block {
                height,
                hash: self.url.clone(),
                proposer: String::new(),
                validators: vec![BlockValidator {
                    public_key: "Mpkey".to_string(),
                    signed: true,
                }],
            }),
        }
    }

    async fn candidate(&self, public_key: &str) -> Result<Candidate> {
        self.hit()?;
        Ok(Candidate {
            public_key: public_key.to_string(),
            control_address: "Mxcontrol".to_string(),
            owner_address: String::new(),
            reward_address: String::new(),
            status: 2,
            is_validator: true,
            jailed_until: 0,
        })
    }

    async fn address(&self, _address: &str) -> Result<Address> {
        let height = self.hit()?;
        Ok(Address {
            transaction_count: height,
        })
    }

    async fn send_transaction(&self, _tx: &str) -> Result<TxOutcome> {
        self.hit()?;
        Ok(TxOutcome::Rejected {
            code: 114,
            message: format!("nonce rejected by {}", self.url),
        })
    }
}

fn client(endpoints: &[Arc<MockEndpoint>]) -> NodeClient {
    NodeClient::new(
        endpoints
            .iter()
            .map(|e| e.clone() as Arc<dyn NodeApi>)
            .collect(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_failover_reaches_last_endpoint() -> anyhow::Result<()> {
    let a = MockEndpoint::new("http://a", Behaviour::Down);
    let b = MockEndpoint::new("http://b", Behaviour::Down);
    let c = MockEndpoint::new("http://c", Behaviour::Up { height: 77 });
    let node = client(&[a.clone(), b.clone(), c.clone()]);

    assert_eq!(node.status().await?.latest_height, 77);
    assert_eq!(node.block(5).await?.hash, "http://c");
    assert_eq!(node.candidate("Mpkey").await?.control_address, "Mxcontrol");
    assert_eq!(node.address("Mxcontrol").await?.transaction_count, 77);
    assert_eq!(node.current_index(), 2);
    assert_eq!(node.url(), "http://c");

    // every call starts over from the first endpoint
    assert_eq!(a.calls(), 4);
    assert_eq!(b.calls(), 4);
    assert_eq!(c.calls(), 4);
    Ok(())
}

#[tokio::test]
async fn test_first_healthy_endpoint_wins() -> anyhow::Result<()> {
    let a = MockEndpoint::new("http://a", Behaviour::Up { height: 10 });
    let b = MockEndpoint::new("http://b", Behaviour::Up { height: 11 });
    let node = client(&[a.clone(), b.clone()]);

    assert_eq!(node.status().await?.latest_height, 10);
    assert_eq!(b.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_all_endpoints_down_returns_last_transport_error() {
    let a = MockEndpoint::new("http://a", Behaviour::Down);
    let b = MockEndpoint::new("http://b", Behaviour::Down);
    let node = client(&[a, b]);

    match node.status().await {
        Err(Error::Transport { endpoint, .. }) => assert_eq!(endpoint, "http://b"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_block_not_found_is_authoritative() {
    let a = MockEndpoint::new("http://a", Behaviour::NotYet);
    let b = MockEndpoint::new("http://b", Behaviour::Up { height: 1 });
    let node = client(&[a.clone(), b.clone()]);

    assert!(matches!(
        node.block(99).await,
        Err(Error::BlockNotFound { height: 99 })
    ));
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 0);
}

#[tokio::test]
async fn test_application_errors_are_not_retried() {
    let a = MockEndpoint::new("http://a", Behaviour::Rejecting);
    let b = MockEndpoint::new("http://b", Behaviour::Up { height: 1 });
    let node = client(&[a, b.clone()]);

    assert!(matches!(
        node.candidate("Mpkey").await,
        Err(Error::Application { code: 500, .. })
    ));
    assert_eq!(b.calls(), 0);
}

#[tokio::test]
async fn test_rejected_transaction_is_returned_not_retried() -> anyhow::Result<()> {
    let a = MockEndpoint::new("http://a", Behaviour::Down);
    let b = MockEndpoint::new("http://b", Behaviour::Up { height: 1 });
    let c = MockEndpoint::new("http://c", Behaviour::Up { height: 1 });
    let node = client(&[a, b, c.clone()]);

    let outcome = node.send_transaction("0xf8").await?;
    assert_eq!(
        outcome,
        TxOutcome::Rejected {
            code: 114,
            message: "nonce rejected by http://b".to_string()
        }
    );
    assert_eq!(c.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_ping_reports_each_endpoint() {
    let a = MockEndpoint::new("http://a", Behaviour::Down);
    let b = MockEndpoint::new("http://b", Behaviour::CatchingUp);
    let c = MockEndpoint::new("http://c", Behaviour::Up { height: 3 });
    let node = client(&[a, b, c]);

    let health = node.ping().await;
    assert!(matches!(&health[0], EndpointHealth::Unreachable { url, .. } if url == "http://a"));
    assert!(matches!(&health[1], EndpointHealth::CatchingUp { height: 1, .. }));
    assert_eq!(
        health[2],
        EndpointHealth::Healthy {
            url: "http://c".to_string(),
            height: 3
        }
    );
    assert_eq!(health.iter().filter(|h| h.is_healthy()).count(), 1);
}

#[test]
fn test_empty_endpoint_list_is_rejected() {
    assert!(matches!(NodeClient::new(vec![]), Err(Error::NoEndpoints)));
}
