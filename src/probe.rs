use crate::config::Config;
use crate::provider::NetworkReachability;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

/// Answers "is the network reachable" using short-timeout checks against
/// a fixed list of well-known hosts.
///
/// The probe never errors: every network fault is treated as a negative
/// reachability signal. Primary hosts are tried in order; if all of them
/// fail, the fallback host gets one attempt with the same timeout. There
/// are no retries beyond the fixed host list.
pub struct ConnectivityProbe {
    reachability: Arc<dyn NetworkReachability>,
    hosts: Vec<(String, u16)>,
    fallback: (String, u16),
    timeout: Duration,
}

impl ConnectivityProbe {
    pub fn new(reachability: Arc<dyn NetworkReachability>, config: &Config) -> Self {
        Self {
            reachability,
            hosts: config.probe_hosts.clone(),
            fallback: config.fallback_host.clone(),
            timeout: config.probe_timeout,
        }
    }

    /// Returns `true` as soon as any host answers.
    pub async fn probe(&self) -> bool {
        for (host, port) in &self.hosts {
            if self.reachability.reachable(host, *port, self.timeout).await {
                debug!("connectivity confirmed via {}:{}", host, port);
                return true;
            }
        }

        let (host, port) = &self.fallback;
        info!("primary probe hosts unreachable, trying fallback {}", host);
        self.reachability.reachable(host, *port, self.timeout).await
    }
}
