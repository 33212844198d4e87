use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the measurement orchestration engine.
///
/// The defaults reproduce the engine's fixed policy: 5 second probe
/// timeouts, a 30 second budget for each throughput phase, the nearest
/// 10 candidates, up to 3 attempts per run and a 1 second backoff
/// between failed attempts. Use the builder methods to override a value.
///
/// # Examples
///
/// ```
/// use speedmon::Config;
/// use std::time::Duration;
///
/// let config = Config::default()
///     .with_max_attempts(5)
///     .with_backoff(Duration::from_millis(500));
///
/// assert_eq!(config.max_attempts, 5);
/// assert_eq!(config.pool_size, 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Well-known hosts probed for connectivity, in order.
    pub probe_hosts: Vec<(String, u16)>,

    /// Host tried once if every primary probe host fails.
    pub fallback_host: (String, u16),

    /// Timeout for each individual reachability check.
    pub probe_timeout: Duration,

    /// Timeout for each throughput phase (download and upload separately).
    /// Reading the ping has no independent timeout.
    pub phase_timeout: Duration,

    /// How many of the nearest discovered servers to keep as candidates.
    pub pool_size: usize,

    /// How many candidates to attempt before the run fails.
    pub max_attempts: usize,

    /// Delay inserted between a failed attempt and the next candidate.
    pub backoff: Duration,

    /// Buffer capacity of the broadcast progress channel.
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe_hosts: vec![
                ("1.1.1.1".to_string(), 80),
                ("8.8.8.8".to_string(), 53),
            ],
            fallback_host: ("www.google.com".to_string(), 80),
            probe_timeout: Duration::from_secs(5),
            phase_timeout: Duration::from_secs(30),
            pool_size: 10,
            max_attempts: 3,
            backoff: Duration::from_secs(1),
            channel_capacity: 100,
        }
    }
}

impl Config {
    /// Creates a configuration with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the primary probe host list.
    pub fn with_probe_hosts(mut self, hosts: Vec<(String, u16)>) -> Self {
        self.probe_hosts = hosts;
        self
    }

    /// Replaces the fallback probe host.
    pub fn with_fallback_host(mut self, host: String, port: u16) -> Self {
        self.fallback_host = (host, port);
        self
    }

    /// Sets the timeout for each reachability check.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the per-phase measurement timeout.
    ///
    /// # Examples
    ///
    /// ```
    /// use speedmon::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::default().with_phase_timeout(Duration::from_secs(60));
    /// assert_eq!(config.phase_timeout, Duration::from_secs(60));
    /// ```
    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }

    /// Sets how many of the nearest servers are kept as candidates.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Sets the maximum number of candidates attempted per run.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay between failed attempts.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the buffer capacity of the progress broadcast channel.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}
