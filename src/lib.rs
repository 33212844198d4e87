//! speedmon - network speed measurement orchestration
//!
//! This library measures network latency and throughput by probing
//! connectivity, discovering and ranking candidate measurement servers,
//! and executing a bounded, retrying sequence of timed measurement
//! attempts, while emitting a real-time progress narrative to listeners.
//!
//! # Features
//!
//! - Connectivity probing against well-known hosts with short timeouts
//! - Nearest-N server discovery with stable distance ranking
//! - Bounded retries across ranked candidates with fixed backoff
//! - Ordered progress events via callbacks or a broadcast channel
//! - Cooperative cancellation of in-flight runs
//! - Pluggable discovery, measurement and persistence capabilities
//!
//! The engine deliberately does not speak any concrete measurement
//! protocol; transfer measurement is delegated to the
//! [`ThroughputMeasurementProvider`] capability.

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod probe;
pub mod progress;
pub mod provider;
pub mod record;

pub use catalog::{ServerCandidate, ServerCatalog};
pub use config::Config;
pub use error::{Error, Result};
pub use executor::{MeasurementExecutor, MeasurementOutcome};
pub use orchestrator::{Orchestrator, RunState};
pub use probe::ConnectivityProbe;
pub use progress::{FailureReport, Phase, ProgressCallback, ProgressChannel, RunEvent};
pub use provider::{
    NetworkReachability, ServerDiscoverySource, TcpReachability, ThroughputMeasurementProvider,
};
pub use record::{PersistenceSink, RunRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
