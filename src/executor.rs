use crate::catalog::ServerCandidate;
use crate::provider::ThroughputMeasurementProvider;
use crate::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Final measurements of one successful run.
///
/// Produced exactly once per run; never partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementOutcome {
    pub ping_ms: f64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    /// The candidate the measurement was pinned to.
    pub server: ServerCandidate,
}

/// Runs one full measurement attempt against a single candidate.
///
/// An attempt is four sequential phases: bind the candidate as the active
/// target, measure download, measure upload, read the round-trip latency.
/// Each throughput phase is bounded by the configured timeout; binding and
/// the ping read have none of their own. Sub-progress checkpoints fire at
/// 30/60/90 percent of the attempt, for the caller to scale into its
/// overall progress range.
pub struct MeasurementExecutor {
    provider: Arc<dyn ThroughputMeasurementProvider>,
    phase_timeout: Duration,
    cancel: CancellationToken,
}

impl MeasurementExecutor {
    pub fn new(
        provider: Arc<dyn ThroughputMeasurementProvider>,
        phase_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            phase_timeout,
            cancel,
        }
    }

    /// Measures `candidate`, reporting attempt-relative sub-progress
    /// through `checkpoint`.
    ///
    /// On any phase error or timeout the attempt fails as a whole with
    /// [`Error::Measurement`] carrying the candidate's sponsor label, or
    /// [`Error::Cancelled`] if the token fired.
    pub async fn measure(
        &self,
        candidate: &ServerCandidate,
        mut checkpoint: impl FnMut(u8, String),
    ) -> Result<MeasurementOutcome> {
        debug!("binding measurement session to {}", candidate.label());
        self.phase(candidate, "binding", None, self.provider.bind(candidate))
            .await?;

        checkpoint(30, "measuring download speed...".to_string());
        let download_mbps = self
            .phase(
                candidate,
                "download",
                Some(self.phase_timeout),
                self.provider.measure_download(self.phase_timeout),
            )
            .await?;

        checkpoint(60, "measuring upload speed...".to_string());
        let upload_mbps = self
            .phase(
                candidate,
                "upload",
                Some(self.phase_timeout),
                self.provider.measure_upload(self.phase_timeout),
            )
            .await?;

        checkpoint(90, "measuring ping...".to_string());
        let ping_ms = self
            .phase(candidate, "ping", None, self.provider.read_ping())
            .await?;

        debug!(
            "attempt against {} succeeded: {:.1} ms / {:.1} down / {:.1} up",
            candidate.sponsor, ping_ms, download_mbps, upload_mbps
        );
        Ok(MeasurementOutcome {
            ping_ms,
            download_mbps,
            upload_mbps,
            server: candidate.clone(),
        })
    }

    /// Runs one phase under the cancellation token and an optional timeout,
    /// tagging any failure with the candidate's sponsor.
    async fn phase<T>(
        &self,
        candidate: &ServerCandidate,
        what: &str,
        limit: Option<Duration>,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let guarded = async {
            match limit {
                Some(limit) => match timeout(limit, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Measurement {
                        sponsor: candidate.sponsor.clone(),
                        message: format!("{} timed out after {:?}", what, limit),
                    }),
                },
                None => fut.await,
            }
        };

        let result = tokio::select! {
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            result = guarded => result,
        };

        result.map_err(|err| match err {
            Error::Cancelled | Error::Measurement { .. } => err,
            other => Error::Measurement {
                sponsor: candidate.sponsor.clone(),
                message: other.to_string(),
            },
        })
    }
}
