use crate::provider::ServerDiscoverySource;
use crate::{Error, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A discovered measurement server, ranked by distance.
///
/// Candidates are immutable once discovered; each run builds a fresh list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerCandidate {
    /// Identifier understood by the measurement provider's `bind`.
    pub id: String,
    /// Display name, usually the server's city.
    pub name: String,
    pub country: String,
    /// Operator label, used in progress messages and error reports.
    pub sponsor: String,
    /// Distance from the caller; smaller is closer.
    pub distance_km: f64,
}

impl ServerCandidate {
    /// Human-readable label used in discovery progress messages.
    pub fn label(&self) -> String {
        format!("{} - {}, {}", self.sponsor, self.name, self.country)
    }
}

/// Discovers and ranks candidate measurement servers.
///
/// `discover` narrows the source's full list to the nearest `pool_size`
/// servers, sorted ascending by distance with ties kept in discovery
/// order, and announces each kept candidate through the supplied emitter.
pub struct ServerCatalog {
    source: Arc<dyn ServerDiscoverySource>,
    pool_size: usize,
}

impl ServerCatalog {
    pub fn new(source: Arc<dyn ServerDiscoverySource>, pool_size: usize) -> Self {
        Self { source, pool_size }
    }

    /// Queries the discovery source and returns the ranked candidate pool.
    ///
    /// Fails with [`Error::Discovery`] if the source errors or returns no
    /// servers; callers never observe a nominally successful empty pool.
    pub async fn discover(
        &self,
        mut on_candidate: impl FnMut(&ServerCandidate),
    ) -> Result<Vec<ServerCandidate>> {
        let mut servers = self.source.list_servers().await.map_err(|err| match err {
            Error::Discovery(_) => err,
            other => Error::Discovery(other.to_string()),
        })?;

        if servers.is_empty() {
            return Err(Error::Discovery(
                "discovery source returned no servers".to_string(),
            ));
        }

        // Stable sort: equal distances keep discovery order.
        servers.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        servers.truncate(self.pool_size);

        info!("discovered {} candidate servers", servers.len());
        for candidate in &servers {
            debug!(
                "candidate {} at {:.1} km: {}",
                candidate.id,
                candidate.distance_km,
                candidate.label()
            );
            on_candidate(candidate);
        }

        Ok(servers)
    }
}
