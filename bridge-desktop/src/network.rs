//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Public DNS resolver used as the default reachability probe.
const DEFAULT_PROBE: &str = "8.8.8.8:53";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Desktop network monitor implementation
///
/// Provides basic network connectivity detection by opening a TCP connection
/// to a probe address. Results are cached for a short time so repeated
/// play/pause taps do not each pay for a connection attempt.
///
/// Note: Platform-specific implementations (Linux netlink, macOS SystemConfiguration,
/// Windows WinAPI) would be more robust but require additional dependencies.
pub struct DesktopNetworkMonitor {
    probe: String,
    timeout: Duration,
    cache_ttl: Duration,
    cached_info: Arc<Mutex<Option<(Instant, NetworkInfo)>>>,
}

impl DesktopNetworkMonitor {
    /// Create a new network monitor
    pub fn new() -> Self {
        Self {
            probe: DEFAULT_PROBE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache_ttl: Duration::from_secs(2),
            cached_info: Arc::new(Mutex::new(None)),
        }
    }

    /// Probe `addr` (`host:port`) instead of the public resolver.
    pub fn with_probe(mut self, addr: impl Into<String>) -> Self {
        self.probe = addr.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How long a probe result is reused. Zero disables caching.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(&self.probe)).await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) => NetworkStatus::Disconnected,
            Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let mut cached = self.cached_info.lock().await;
        if let Some((at, info)) = cached.as_ref() {
            if at.elapsed() < self.cache_ttl {
                return Ok(info.clone());
            }
        }

        let status = self.check_connectivity().await;
        let info = NetworkInfo {
            status,
            network_type: if status == NetworkStatus::Connected {
                // On desktop, we assume Ethernet/WiFi but can't easily distinguish without platform-specific APIs
                Some(NetworkType::Other)
            } else {
                None
            },
            // Desktop connections are typically not metered
            is_metered: false,
        };

        *cached = Some((Instant::now(), info.clone()));
        debug!(status = ?status, probe = %self.probe, "Network info updated");

        Ok(info)
    }
}
