use crate::executor::MeasurementOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Phase of a measurement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    CheckingConnectivity,
    DiscoveringServers,
    Measuring,
    Succeeded,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::CheckingConnectivity => "checking connectivity",
            Phase::DiscoveringServers => "discovering servers",
            Phase::Measuring => "measuring",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal description of a failed run, produced exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Phase at which the run failed.
    pub phase: Phase,
    /// The most recent error's text, not a concatenation of all errors.
    pub message: String,
    /// Number of candidates actually attempted.
    pub attempts_tried: usize,
}

/// Event emitted during a measurement run.
///
/// A run produces an ordered sequence of `Progress` events terminated by
/// exactly one `Completed` or `Failed`. Percent is an integer in 0..=100
/// and never decreases within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Intermediate progress update.
    Progress {
        percent: u8,
        phase: Phase,
        message: String,
    },
    /// The run succeeded with final measurements.
    Completed(MeasurementOutcome),
    /// The run failed; no further events follow.
    Failed(FailureReport),
}

/// Observer for run events.
///
/// Implemented automatically for any `Fn(RunEvent) + Send + Sync` closure.
///
/// # Examples
///
/// ```
/// use speedmon::{ProgressCallback, RunEvent};
///
/// struct Printer;
///
/// impl ProgressCallback for Printer {
///     fn on_event(&self, event: RunEvent) {
///         if let RunEvent::Progress { percent, message, .. } = event {
///             println!("{percent:>3}% {message}");
///         }
///     }
/// }
/// ```
pub trait ProgressCallback: Send + Sync {
    fn on_event(&self, event: RunEvent);
}

impl<F> ProgressCallback for F
where
    F: Fn(RunEvent) + Send + Sync,
{
    fn on_event(&self, event: RunEvent) {
        self(event)
    }
}

pub(crate) type CallbackRef = Arc<dyn ProgressCallback>;

/// Fire-and-forget fan-out of [`RunEvent`]s to any number of listeners.
///
/// Events emitted while no listener is subscribed are dropped, not
/// buffered for replay; a late subscriber only sees subsequent events.
pub struct ProgressChannel {
    tx: broadcast::Sender<RunEvent>,
}

impl ProgressChannel {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Attaches a listener. Subscribe before starting a run to observe it
    /// from the beginning.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn send(&self, event: RunEvent) {
        // No receivers is fine; emission is fire-and-forget.
        let _ = self.tx.send(event);
    }
}
