use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No probe host was reachable. Fatal for the run, never retried.
    #[error("no connectivity: {0}")]
    Connectivity(String),

    /// The discovery source was unreachable or returned no servers.
    /// Fatal for the run, never retried.
    #[error("server discovery failed: {0}")]
    Discovery(String),

    /// A single measurement attempt failed. Recoverable: the orchestrator
    /// moves on to the next candidate.
    #[error("server {sponsor}: {message}")]
    Measurement { sponsor: String, message: String },

    /// Every attempted candidate failed. Carries only the most recent
    /// attempt's error text.
    #[error("all {attempts} attempted servers failed; last error: {last_error}")]
    AttemptsExhausted { attempts: usize, last_error: String },

    /// A start request arrived while a run was already active.
    #[error("a measurement run is already in progress")]
    AlreadyRunning,

    /// The run was cancelled through its cancellation token.
    #[error("run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
