use crate::catalog::ServerCatalog;
use crate::config::Config;
use crate::executor::{MeasurementExecutor, MeasurementOutcome};
use crate::probe::ConnectivityProbe;
use crate::progress::{CallbackRef, FailureReport, Phase, ProgressCallback, ProgressChannel, RunEvent};
use crate::provider::{NetworkReachability, ServerDiscoverySource, ThroughputMeasurementProvider};
use crate::record::{PersistenceSink, RunRecord};
use crate::{Error, Result};
use log::{info, warn};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of an orchestrator instance.
///
/// At most one run is active at a time: a start request is accepted only
/// from `Idle` or a terminal state, and the transition into `Running` is
/// atomic with respect to concurrent start requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunState::Running,
            2 => RunState::Succeeded,
            3 => RunState::Failed,
            _ => RunState::Idle,
        }
    }

    /// Whether a run has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }
}

/// Drives a full measurement run: connectivity probe, server discovery,
/// then bounded retries over the nearest candidates.
///
/// Every intermediate observation is reported through the progress channel
/// and the optional callback rather than returned to the caller; the
/// caller only sees the terminal [`MeasurementOutcome`] or [`Error`].
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use speedmon::{
///     Config, Orchestrator, Result, RunEvent, ServerCandidate,
///     ServerDiscoverySource, TcpReachability, ThroughputMeasurementProvider,
/// };
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// struct MySource;
///
/// #[async_trait]
/// impl ServerDiscoverySource for MySource {
///     async fn list_servers(&self) -> Result<Vec<ServerCandidate>> {
///         // query your discovery endpoint here
///         Ok(Vec::new())
///     }
/// }
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl ThroughputMeasurementProvider for MyProvider {
///     async fn bind(&self, _candidate: &ServerCandidate) -> Result<()> { Ok(()) }
///     async fn measure_download(&self, _limit: Duration) -> Result<f64> { Ok(0.0) }
///     async fn measure_upload(&self, _limit: Duration) -> Result<f64> { Ok(0.0) }
///     async fn read_ping(&self) -> Result<f64> { Ok(0.0) }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let orchestrator = Orchestrator::new(
///     Config::default(),
///     Arc::new(TcpReachability),
///     Arc::new(MySource),
///     Arc::new(MyProvider),
/// )
/// .with_callback(|event: RunEvent| println!("{event:?}"));
///
/// let outcome = orchestrator.run().await?;
/// println!("{:.1} Mbps down", outcome.download_mbps);
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    config: Config,
    reachability: Arc<dyn NetworkReachability>,
    discovery: Arc<dyn ServerDiscoverySource>,
    provider: Arc<dyn ThroughputMeasurementProvider>,
    sink: Option<Arc<dyn PersistenceSink>>,
    callback: Option<CallbackRef>,
    channel: ProgressChannel,
    state: AtomicU8,
    cancel: CancellationToken,
}

/// Internal failure carrying enough context to build the terminal report.
struct RunFailure {
    phase: Phase,
    attempts_tried: usize,
    error: Error,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        reachability: Arc<dyn NetworkReachability>,
        discovery: Arc<dyn ServerDiscoverySource>,
        provider: Arc<dyn ThroughputMeasurementProvider>,
    ) -> Self {
        let channel = ProgressChannel::new(config.channel_capacity);
        Self {
            config,
            reachability,
            discovery,
            provider,
            sink: None,
            callback: None,
            channel,
            state: AtomicU8::new(RunState::Idle as u8),
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches an observer invoked synchronously for every event.
    pub fn with_callback<C: ProgressCallback + 'static>(mut self, callback: C) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Attaches a store that receives one [`RunRecord`] per terminal event.
    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attaches a broadcast listener. Events are fire-and-forget: subscribe
    /// before starting a run to observe it from the beginning.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.channel.subscribe()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Token cancelling the in-flight run between and within phases.
    ///
    /// Cancellation is sticky: once fired, this orchestrator will refuse
    /// further work, so construct a new instance to measure again.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Spawns a run on a dedicated task so blocking network phases never
    /// stall the caller. The terminal outcome is delivered through the
    /// progress channel and callback.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyRunning`] if a run is active; the in-flight run is
    /// unaffected.
    pub fn start(self: Arc<Self>) -> Result<JoinHandle<()>> {
        self.try_begin()?;
        Ok(tokio::spawn(async move {
            let _ = self.run_locked().await;
        }))
    }

    /// Runs a measurement to completion on the calling task.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyRunning`] if a run is active, otherwise the terminal
    /// error mirrored by the emitted [`FailureReport`].
    pub async fn run(&self) -> Result<MeasurementOutcome> {
        self.try_begin()?;
        self.run_locked().await
    }

    /// Compare-and-set from Idle/terminal into Running. Rejects without
    /// side effects if a run is active.
    fn try_begin(&self) -> Result<()> {
        loop {
            let current = self.state.load(Ordering::Acquire);
            if current == RunState::Running as u8 {
                return Err(Error::AlreadyRunning);
            }
            if self
                .state
                .compare_exchange(
                    current,
                    RunState::Running as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    fn dispatch(&self, event: RunEvent) {
        self.channel.send(event.clone());
        if let Some(callback) = &self.callback {
            callback.on_event(event);
        }
    }

    async fn persist(&self, record: RunRecord) {
        if let Some(sink) = &self.sink {
            if let Err(err) = sink.record(&record).await {
                warn!("failed to persist run record: {}", err);
            }
        }
    }

    /// Executes the pipeline; the caller already holds the Running state.
    async fn run_locked(&self) -> Result<MeasurementOutcome> {
        let mut emitter = Emitter {
            orchestrator: self,
            last_percent: 0,
        };

        match self.pipeline(&mut emitter).await {
            Ok(outcome) => {
                emitter.progress(100, Phase::Succeeded, "measurement complete");
                info!(
                    "run succeeded via {}: {:.1} ms / {:.1} Mbps down / {:.1} Mbps up",
                    outcome.server.sponsor,
                    outcome.ping_ms,
                    outcome.download_mbps,
                    outcome.upload_mbps
                );
                self.dispatch(RunEvent::Completed(outcome.clone()));
                self.persist(RunRecord::success(&outcome)).await;
                self.state
                    .store(RunState::Succeeded as u8, Ordering::Release);
                Ok(outcome)
            }
            Err(failure) => {
                let message = match &failure.error {
                    Error::AttemptsExhausted { last_error, .. } => last_error.clone(),
                    other => other.to_string(),
                };
                warn!("run failed while {}: {}", failure.phase, failure.error);
                self.dispatch(RunEvent::Failed(FailureReport {
                    phase: failure.phase,
                    message,
                    attempts_tried: failure.attempts_tried,
                }));
                self.persist(RunRecord::failure()).await;
                self.state.store(RunState::Failed as u8, Ordering::Release);
                Err(failure.error)
            }
        }
    }

    async fn pipeline(
        &self,
        emitter: &mut Emitter<'_>,
    ) -> std::result::Result<MeasurementOutcome, RunFailure> {
        emitter.progress(
            0,
            Phase::CheckingConnectivity,
            "checking internet connectivity...",
        );
        let probe = ConnectivityProbe::new(Arc::clone(&self.reachability), &self.config);
        let reachable = tokio::select! {
            _ = self.cancel.cancelled() => {
                return Err(RunFailure {
                    phase: Phase::CheckingConnectivity,
                    attempts_tried: 0,
                    error: Error::Cancelled,
                });
            }
            reachable = probe.probe() => reachable,
        };
        if !reachable {
            return Err(RunFailure {
                phase: Phase::CheckingConnectivity,
                attempts_tried: 0,
                error: Error::Connectivity(
                    "no reachable host; check your network connection".to_string(),
                ),
            });
        }
        emitter.progress(10, Phase::CheckingConnectivity, "internet connection is up");

        emitter.progress(
            15,
            Phase::DiscoveringServers,
            "looking for measurement servers...",
        );
        let catalog = ServerCatalog::new(Arc::clone(&self.discovery), self.config.pool_size);
        let discovered = tokio::select! {
            _ = self.cancel.cancelled() => {
                return Err(RunFailure {
                    phase: Phase::DiscoveringServers,
                    attempts_tried: 0,
                    error: Error::Cancelled,
                });
            }
            discovered = catalog.discover(|candidate| {
                emitter.progress(
                    15,
                    Phase::DiscoveringServers,
                    format!("found server: {}", candidate.label()),
                );
            }) => discovered,
        };
        let candidates = discovered.map_err(|error| RunFailure {
            phase: Phase::DiscoveringServers,
            attempts_tried: 0,
            error,
        })?;
        emitter.progress(
            20,
            Phase::DiscoveringServers,
            format!("found {} candidate servers", candidates.len()),
        );

        let executor = MeasurementExecutor::new(
            Arc::clone(&self.provider),
            self.config.phase_timeout,
            self.cancel.clone(),
        );
        let total = candidates.len().min(self.config.max_attempts);
        let mut last_error: Option<Error> = None;

        for (index, candidate) in candidates.iter().take(total).enumerate() {
            // Each attempt's progress window starts a step higher so percent
            // keeps advancing across retries.
            let base = (25 + 10 * index as u32).min(90) as u8;
            emitter.progress(
                base,
                Phase::Measuring,
                format!("attempt {}/{}: {}...", index + 1, total, candidate.sponsor),
            );

            let span = 95u32.saturating_sub(base as u32);
            let result = executor
                .measure(candidate, |raw, message| {
                    let scaled = base as u32 + u32::from(raw.min(100)) * span / 100;
                    emitter.progress(scaled as u8, Phase::Measuring, message);
                })
                .await;

            match result {
                Ok(outcome) => return Ok(outcome),
                Err(Error::Cancelled) => {
                    return Err(RunFailure {
                        phase: Phase::Measuring,
                        attempts_tried: index + 1,
                        error: Error::Cancelled,
                    });
                }
                Err(error) => {
                    warn!(
                        "attempt {}/{} against {} failed: {}",
                        index + 1,
                        total,
                        candidate.sponsor,
                        error
                    );
                    emitter.progress(
                        base,
                        Phase::Measuring,
                        format!("server {} unavailable, trying another...", candidate.sponsor),
                    );
                    last_error = Some(error);

                    if index + 1 < total {
                        tokio::select! {
                            _ = self.cancel.cancelled() => {
                                return Err(RunFailure {
                                    phase: Phase::Measuring,
                                    attempts_tried: index + 1,
                                    error: Error::Cancelled,
                                });
                            }
                            _ = tokio::time::sleep(self.config.backoff) => {}
                        }
                    }
                }
            }
        }

        let last_error = last_error
            .map(|error| error.to_string())
            .unwrap_or_else(|| "no candidate could be attempted".to_string());
        Err(RunFailure {
            phase: Phase::Measuring,
            attempts_tried: total,
            error: Error::AttemptsExhausted {
                attempts: total,
                last_error,
            },
        })
    }
}

/// Emits progress events with percent clamped to be non-decreasing within
/// the run.
struct Emitter<'a> {
    orchestrator: &'a Orchestrator,
    last_percent: u8,
}

impl Emitter<'_> {
    fn progress(&mut self, percent: u8, phase: Phase, message: impl Into<String>) {
        let percent = percent.min(100).max(self.last_percent);
        self.last_percent = percent;
        self.orchestrator.dispatch(RunEvent::Progress {
            percent,
            phase,
            message: message.into(),
        });
    }
}
