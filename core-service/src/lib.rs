//! Player service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (decoder, audio
//! focus, media session, settings, network) into the playback core and runs
//! the background tasks that deliver host callbacks. Desktop apps typically
//! enable the `desktop-shims` feature (which depends on `bridge-desktop`) and
//! call [`bootstrap_desktop`]; mobile hosts build a
//! [`PlayerConfig`](core_runtime::config::PlayerConfig) with their own bridges
//! and call [`PlayerService::start`].

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{NetworkMonitor, NotificationAction};
use core_playback::error::NETWORK_NOTICE;
use core_playback::{
    PlaybackController, PlaybackError, PlaybackSnapshot, PositionPoller, PumpHandle,
    StateNotifier,
};
use core_runtime::config::PlayerConfig;
use core_runtime::events::{EventBus, EventStream};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Primary façade exposed to host applications.
///
/// Owns the controller and the callback pumps. The host forwards UI and
/// notification input here and subscribes to state through
/// [`notifier`](Self::notifier) or [`subscribe_events`](Self::subscribe_events).
pub struct PlayerService {
    controller: Arc<PlaybackController>,
    bus: EventBus,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    require_network: bool,
    poll_interval: Duration,
    pumps: Mutex<Option<PumpHandle>>,
}

impl PlayerService {
    /// Wire `config` into a running service.
    ///
    /// Must be called from within a tokio runtime; the decoder and focus
    /// pumps are spawned onto it.
    pub fn start(config: PlayerConfig) -> Result<Self> {
        config.validate()?;

        let bus = EventBus::new(config.event_buffer_size);
        let (controller, pumps) = PlaybackController::new(&config, bus.clone())?;
        let pumps = pumps.spawn(Arc::clone(&controller));

        info!(
            default_source = %core_runtime::logging::redact_uri(&config.default_source),
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            require_network = config.features.require_network,
            "Player service started"
        );

        Ok(Self {
            controller,
            bus,
            network_monitor: config.network_monitor.clone(),
            require_network: config.features.require_network,
            poll_interval: config.poll_interval,
            pumps: Mutex::new(Some(pumps)),
        })
    }

    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.controller
    }

    /// Listener registry for song, play/pause and seek changes.
    pub fn notifier(&self) -> &Arc<StateNotifier> {
        self.controller.notifier()
    }

    /// Stream of every playback and focus event.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.bus.subscribe())
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.controller.snapshot()
    }

    /// Start sampling the position at the configured interval. The poller
    /// stops by itself once playback stops; start a new one after resuming.
    pub fn track_progress(&self) -> PositionPoller {
        PositionPoller::spawn(
            Arc::clone(&self.controller),
            self.poll_interval,
            self.bus.clone(),
        )
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Play/pause button. Loading a new handle first checks connectivity when
    /// the network gate is enabled.
    pub async fn play_pause(&self) -> Result<()> {
        if !self.controller.has_handle() && self.require_network {
            self.ensure_network().await?;
        }
        self.controller.toggle_play_pause().await?;
        Ok(())
    }

    /// Dispatch a tap on a notification button.
    pub async fn handle_action(&self, action: NotificationAction) -> Result<()> {
        debug!(?action, "Notification action");
        match action {
            NotificationAction::Previous => self.play_previous().await,
            NotificationAction::PlayPause => self.play_pause().await,
            NotificationAction::Next => self.play_next().await,
            // The host brings its UI to the front; nothing to do here.
            NotificationAction::OpenUi => Ok(()),
        }
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.controller.seek_to(position_ms).await?;
        Ok(())
    }

    pub async fn play_next(&self) -> Result<()> {
        self.controller.play_next().await?;
        Ok(())
    }

    pub async fn play_previous(&self) -> Result<()> {
        self.controller.play_previous().await?;
        Ok(())
    }

    /// Release playback and stop the callback pumps. Safe to call twice.
    pub async fn shutdown(&self) -> Result<()> {
        self.controller.release().await?;
        if let Some(pumps) = self.pumps.lock().await.take() {
            pumps.shutdown().await;
            info!("Player service stopped");
        }
        Ok(())
    }

    async fn ensure_network(&self) -> Result<()> {
        let Some(monitor) = &self.network_monitor else {
            return Ok(());
        };
        if monitor.is_connected().await {
            return Ok(());
        }

        warn!("Network unavailable; not loading source");
        self.controller
            .session_publisher()
            .show_notice(NETWORK_NOTICE)
            .await;
        Err(PlaybackError::NetworkUnavailable.into())
    }
}

impl std::fmt::Debug for PlayerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerService")
            .field("controller", &self.controller)
            .field("require_network", &self.require_network)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Uses the clock-driven player, the in-process focus stack, the tracing
/// presenter and the SQLite settings store under the platform data directory.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// let service = core_service::bootstrap_desktop()?;
/// service.play_pause().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop() -> Result<PlayerService> {
    use bridge_desktop::{ClockedMediaPlayerFactory, DesktopNetworkMonitor};

    let config = PlayerConfig::builder()
        .media_player_factory(Arc::new(ClockedMediaPlayerFactory::new()))
        .network_monitor(Arc::new(DesktopNetworkMonitor::new()))
        .build()?;
    PlayerService::start(config)
}
