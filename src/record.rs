use crate::executor::MeasurementOutcome;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One history entry per completed run, successful or not.
///
/// Failed runs produce an all-zero sentinel with `success = false`,
/// preserving an audit trail of attempted-but-failed runs.
///
/// # Examples
///
/// ```
/// let record = speedmon::RunRecord::failure();
/// let json = record.to_json().unwrap();
/// assert!(json.contains("\"success\":false"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub ping_ms: f64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub server_name: String,
    pub server_country: String,
    pub success: bool,
}

impl RunRecord {
    /// Builds the record for a successful run.
    pub fn success(outcome: &MeasurementOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            ping_ms: outcome.ping_ms,
            download_mbps: outcome.download_mbps,
            upload_mbps: outcome.upload_mbps,
            server_name: outcome.server.sponsor.clone(),
            server_country: outcome.server.country.clone(),
            success: true,
        }
    }

    /// Builds the failure sentinel.
    pub fn failure() -> Self {
        Self {
            timestamp: Utc::now(),
            ping_ms: 0.0,
            download_mbps: 0.0,
            upload_mbps: 0.0,
            server_name: String::new(),
            server_country: String::new(),
            success: false,
        }
    }

    /// JSON wire form of the record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Downstream store receiving one [`RunRecord`] per terminal event.
///
/// Sink errors are logged by the orchestrator and never fail the run.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn record(&self, record: &RunRecord) -> Result<()>;
}
