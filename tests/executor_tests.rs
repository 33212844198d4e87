// Single-attempt behavior: phase sequencing, timeouts and cancellation.

use async_trait::async_trait;
use speedmon::{
    Error, MeasurementExecutor, Result, ServerCandidate, ThroughputMeasurementProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn candidate() -> ServerCandidate {
    ServerCandidate {
        id: "s1".to_string(),
        name: "Testville".to_string(),
        country: "Testland".to_string(),
        sponsor: "TestNet".to_string(),
        distance_km: 4.2,
    }
}

enum Mode {
    Ok,
    SlowDownload(Duration),
    FailBind,
    FailUpload,
}

struct ModalProvider(Mode);

#[async_trait]
impl ThroughputMeasurementProvider for ModalProvider {
    async fn bind(&self, candidate: &ServerCandidate) -> Result<()> {
        match self.0 {
            Mode::FailBind => Err(Error::Measurement {
                sponsor: candidate.sponsor.clone(),
                message: "tcp handshake refused".to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn measure_download(&self, _limit: Duration) -> Result<f64> {
        if let Mode::SlowDownload(delay) = self.0 {
            tokio::time::sleep(delay).await;
        }
        Ok(150.0)
    }

    async fn measure_upload(&self, _limit: Duration) -> Result<f64> {
        match self.0 {
            Mode::FailUpload => Err(Error::Measurement {
                sponsor: "TestNet".to_string(),
                message: "socket closed mid-transfer".to_string(),
            }),
            _ => Ok(40.0),
        }
    }

    async fn read_ping(&self) -> Result<f64> {
        Ok(12.0)
    }
}

fn executor(mode: Mode, phase_timeout: Duration) -> MeasurementExecutor {
    MeasurementExecutor::new(
        Arc::new(ModalProvider(mode)),
        phase_timeout,
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn checkpoints_fire_at_30_60_90() {
    let executor = executor(Mode::Ok, Duration::from_secs(1));
    let mut checkpoints = Vec::new();

    let outcome = executor
        .measure(&candidate(), |percent, _message| checkpoints.push(percent))
        .await
        .unwrap();

    assert_eq!(checkpoints, [30, 60, 90]);
    assert_eq!(outcome.ping_ms, 12.0);
    assert_eq!(outcome.download_mbps, 150.0);
    assert_eq!(outcome.upload_mbps, 40.0);
    assert_eq!(outcome.server, candidate());
}

#[tokio::test]
async fn slow_download_times_out_with_sponsor_label() {
    let executor = executor(
        Mode::SlowDownload(Duration::from_secs(10)),
        Duration::from_millis(20),
    );

    let err = executor.measure(&candidate(), |_, _| {}).await.unwrap_err();
    match err {
        Error::Measurement { sponsor, message } => {
            assert_eq!(sponsor, "TestNet");
            assert!(message.contains("timed out"), "got: {}", message);
        }
        other => panic!("expected Measurement error, got {:?}", other),
    }
}

#[tokio::test]
async fn bind_failure_aborts_before_any_checkpoint() {
    let executor = executor(Mode::FailBind, Duration::from_secs(1));
    let mut checkpoints = Vec::new();

    let err = executor
        .measure(&candidate(), |percent, _| checkpoints.push(percent))
        .await
        .unwrap_err();

    assert!(checkpoints.is_empty());
    assert!(matches!(err, Error::Measurement { .. }));
}

#[tokio::test]
async fn upload_failure_yields_no_partial_outcome() {
    let executor = executor(Mode::FailUpload, Duration::from_secs(1));
    let mut checkpoints = Vec::new();

    let result = executor
        .measure(&candidate(), |percent, _| checkpoints.push(percent))
        .await;

    // Download had finished, but the attempt fails as a whole.
    assert_eq!(checkpoints, [30, 60]);
    assert!(result.is_err());
}

#[tokio::test]
async fn pre_cancelled_token_fails_immediately() {
    let token = CancellationToken::new();
    token.cancel();
    let executor = MeasurementExecutor::new(
        Arc::new(ModalProvider(Mode::Ok)),
        Duration::from_secs(1),
        token,
    );

    let err = executor.measure(&candidate(), |_, _| {}).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn cancellation_interrupts_a_stalled_phase() {
    let token = CancellationToken::new();
    let executor = MeasurementExecutor::new(
        Arc::new(ModalProvider(Mode::SlowDownload(Duration::from_secs(30)))),
        Duration::from_secs(60),
        token.clone(),
    );

    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = executor.measure(&candidate(), |_, _| {}).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    cancel.await.unwrap();
}
