//! Capability seams consumed by the engine.
//!
//! The orchestrator never speaks a measurement protocol itself. It drives
//! these traits, which downstream crates (or test mocks) implement for a
//! concrete speedtest backend.

use crate::catalog::ServerCandidate;
use crate::Result;
use async_trait::async_trait;
use log::debug;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Answers whether a single well-known host is reachable.
#[async_trait]
pub trait NetworkReachability: Send + Sync {
    /// Returns `true` if a connection to `host:port` can be established
    /// within `limit`. Must never block past the limit.
    async fn reachable(&self, host: &str, port: u16, limit: Duration) -> bool;
}

/// Reachability check backed by a plain TCP connect.
///
/// Any error (refusal, resolution failure, timeout) is a negative signal,
/// not a fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpReachability;

#[async_trait]
impl NetworkReachability for TcpReachability {
    async fn reachable(&self, host: &str, port: u16, limit: Duration) -> bool {
        match timeout(limit, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                debug!("probe of {}:{} failed: {}", host, port, err);
                false
            }
            Err(_) => {
                debug!("probe of {}:{} timed out after {:?}", host, port, limit);
                false
            }
        }
    }
}

/// Lists every measurement server known to an external discovery source.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use speedmon::{Result, ServerCandidate, ServerDiscoverySource};
///
/// struct StaticSource(Vec<ServerCandidate>);
///
/// #[async_trait]
/// impl ServerDiscoverySource for StaticSource {
///     async fn list_servers(&self) -> Result<Vec<ServerCandidate>> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait ServerDiscoverySource: Send + Sync {
    /// Returns the full, unranked server list. May fail if the source is
    /// unreachable; an empty list is normalized to a discovery failure by
    /// the catalog.
    async fn list_servers(&self) -> Result<Vec<ServerCandidate>>;
}

/// A measurement session that can be pinned to one candidate at a time.
///
/// `bind` must pin the session to the given candidate so that a retry can
/// deterministically target a different server; implementations must not
/// fall back to any automatic best-server selection. Each call may fail or
/// time out independently.
#[async_trait]
pub trait ThroughputMeasurementProvider: Send + Sync {
    /// Selects `candidate` as the active measurement target.
    async fn bind(&self, candidate: &ServerCandidate) -> Result<()>;

    /// Measures download throughput in Mbps. `limit` is the caller's
    /// budget for the whole phase; implementations should stay within it.
    async fn measure_download(&self, limit: Duration) -> Result<f64>;

    /// Measures upload throughput in Mbps.
    async fn measure_upload(&self, limit: Duration) -> Result<f64>;

    /// Reads the round-trip latency in milliseconds established during
    /// binding. No independent timeout applies.
    async fn read_ping(&self) -> Result<f64>;
}
