// Discovery and ranking tests for the server catalog.

use async_trait::async_trait;
use speedmon::{Error, Result, ServerCandidate, ServerCatalog, ServerDiscoverySource};
use std::sync::Arc;

fn candidate(id: &str, distance_km: f64) -> ServerCandidate {
    ServerCandidate {
        id: id.to_string(),
        name: format!("{} City", id),
        country: "Testland".to_string(),
        sponsor: format!("Sponsor {}", id),
        distance_km,
    }
}

struct StaticSource {
    servers: Vec<ServerCandidate>,
    fail_with: Option<Error>,
}

impl StaticSource {
    fn new(servers: Vec<ServerCandidate>) -> Arc<Self> {
        Arc::new(Self {
            servers,
            fail_with: None,
        })
    }
}

#[async_trait]
impl ServerDiscoverySource for StaticSource {
    async fn list_servers(&self) -> Result<Vec<ServerCandidate>> {
        match &self.fail_with {
            Some(Error::Discovery(message)) => Err(Error::Discovery(message.clone())),
            Some(_) => Err(Error::Discovery("unexpected".to_string())),
            None => Ok(self.servers.clone()),
        }
    }
}

#[tokio::test]
async fn discover_sorts_ascending_by_distance() {
    let source = StaticSource::new(vec![
        candidate("far", 120.0),
        candidate("near", 3.0),
        candidate("mid", 40.0),
    ]);
    let catalog = ServerCatalog::new(source, 10);

    let candidates = catalog.discover(|_| {}).await.unwrap();
    let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["near", "mid", "far"]);
}

#[tokio::test]
async fn discover_narrows_to_the_nearest_pool() {
    let servers: Vec<ServerCandidate> = (0..15)
        .map(|i| candidate(&format!("s{}", i), (15 - i) as f64))
        .collect();
    let catalog = ServerCatalog::new(StaticSource::new(servers), 10);

    let candidates = catalog.discover(|_| {}).await.unwrap();
    assert_eq!(candidates.len(), 10);
    // The five farthest were dropped: s0..s4 had distances 15..11.
    assert!(candidates.iter().all(|c| c.distance_km <= 10.0));
    assert_eq!(candidates[0].id, "s14");
}

#[tokio::test]
async fn equal_distances_keep_discovery_order() {
    let source = StaticSource::new(vec![
        candidate("first", 10.0),
        candidate("second", 10.0),
        candidate("closer", 1.0),
        candidate("third", 10.0),
    ]);
    let catalog = ServerCatalog::new(source, 10);

    let candidates = catalog.discover(|_| {}).await.unwrap();
    let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["closer", "first", "second", "third"]);
}

#[tokio::test]
async fn each_kept_candidate_is_announced_in_rank_order() {
    let source = StaticSource::new(vec![
        candidate("b", 20.0),
        candidate("a", 5.0),
        candidate("c", 90.0),
    ]);
    let catalog = ServerCatalog::new(source, 2);

    let mut announced = Vec::new();
    let candidates = catalog
        .discover(|c| announced.push(c.id.clone()))
        .await
        .unwrap();

    assert_eq!(announced, ["a", "b"]);
    assert_eq!(announced.len(), candidates.len());
}

#[tokio::test]
async fn empty_source_is_a_discovery_error() {
    let catalog = ServerCatalog::new(StaticSource::new(Vec::new()), 10);

    let err = catalog.discover(|_| {}).await.unwrap_err();
    assert!(matches!(err, Error::Discovery(_)));
}

#[tokio::test]
async fn source_error_text_is_preserved() {
    let source = Arc::new(StaticSource {
        servers: Vec::new(),
        fail_with: Some(Error::Discovery("dns lookup failed".to_string())),
    });
    let catalog = ServerCatalog::new(source, 10);

    match catalog.discover(|_| {}).await.unwrap_err() {
        Error::Discovery(message) => assert_eq!(message, "dns lookup failed"),
        other => panic!("expected Discovery error, got {:?}", other),
    }
}

#[test]
fn candidate_label_combines_sponsor_name_and_country() {
    let c = candidate("x", 1.0);
    assert_eq!(c.label(), "Sponsor x - x City, Testland");
}
