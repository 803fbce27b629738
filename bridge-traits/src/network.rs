//! Network Monitoring Abstraction
//!
//! The single track is a remote stream, so the service checks connectivity
//! before it creates a decoder handle.

use crate::{error::Result, platform::PlatformSendSync};

/// Network connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Cellular,
    WiFi,
    Ethernet,
    /// Other or unknown connection type
    Other,
}

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Connected,
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network information
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Whether the connection is metered (has data limits/costs)
    pub is_metered: bool,
}

impl NetworkInfo {
    /// Info describing a host with no usable connection.
    pub fn disconnected() -> Self {
        Self {
            status: NetworkStatus::Disconnected,
            network_type: None,
            is_metered: false,
        }
    }
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **Android**: ConnectivityManager
/// - **iOS**: Network framework
/// - **Desktop**: lightweight reachability probe (see `bridge-desktop`)
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn can_stream(monitor: &dyn NetworkMonitor) -> bool {
///     monitor.is_connected().await
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait NetworkMonitor: PlatformSendSync {
    /// Get current network information
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Check if currently connected to any network.
    ///
    /// Errors from the host are treated as "not connected".
    async fn is_connected(&self) -> bool {
        matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                status: NetworkStatus::Connected,
                ..
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedMonitor(NetworkStatus);

    #[async_trait::async_trait]
    impl NetworkMonitor for FixedMonitor {
        async fn get_network_info(&self) -> Result<NetworkInfo> {
            Ok(NetworkInfo {
                status: self.0,
                network_type: Some(NetworkType::WiFi),
                is_metered: false,
            })
        }
    }

    struct BrokenMonitor;

    #[async_trait::async_trait]
    impl NetworkMonitor for BrokenMonitor {
        async fn get_network_info(&self) -> Result<NetworkInfo> {
            Err(crate::BridgeError::NotAvailable("probe".into()))
        }
    }

    #[tokio::test]
    async fn is_connected_follows_status() {
        assert!(FixedMonitor(NetworkStatus::Connected).is_connected().await);
        assert!(!FixedMonitor(NetworkStatus::Disconnected).is_connected().await);
        assert!(!FixedMonitor(NetworkStatus::Indeterminate).is_connected().await);
    }

    #[tokio::test]
    async fn probe_errors_count_as_offline() {
        assert!(!BrokenMonitor.is_connected().await);
    }

    #[test]
    fn disconnected_info() {
        let info = NetworkInfo::disconnected();
        assert_eq!(info.status, NetworkStatus::Disconnected);
        assert!(info.network_type.is_none());
    }
}
