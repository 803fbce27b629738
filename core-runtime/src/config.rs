//! # Player Configuration Module
//!
//! Provides configuration management for the playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`PlayerConfig`] holding every bridge and setting the playback service
//! needs. It enforces fail-fast validation so a missing bridge is reported at
//! startup with an actionable message instead of surfacing as a silent no-op
//! the first time the user presses play.
//!
//! ## Required Dependencies
//!
//! - `MediaPlayerFactory` - Native decoder handles
//! - `AudioFocusManager` - OS audio focus (desktop default: in-process focus stack)
//! - `SettingsStore` - Position persistence (desktop default: SQLite store)
//!
//! ## Optional Dependencies
//!
//! - `MediaSessionPresenter` - Notification & media session (default: no-op;
//!   desktop default: tracing presenter)
//! - `NetworkMonitor` - Required only when `require_network` is enabled
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::PlayerConfig;
//! use std::sync::Arc;
//!
//! let config = PlayerConfig::builder()
//!     .media_player_factory(Arc::new(MyDecoderFactory))
//!     .focus_manager(Arc::new(MyFocusManager))
//!     .settings_store(Arc::new(MySettings))
//!     .poll_interval(Duration::from_millis(250))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::PlayerConfig;
//!
//! // No media player factory: fails with Error::CapabilityMissing
//! let config = PlayerConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AudioFocusManager, MediaPlayerFactory, MediaSessionPresenter, NetworkMonitor, SettingsStore,
    TrackMetadata,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Sample stream played when the caller never supplied a source.
pub const DEFAULT_SOURCE_URI: &str =
    "https://www.learningcontainer.com/wp-content/uploads/2020/02/Kalimba.mp3";

/// Default interval of the position poller.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Volume applied while another app holds duckable focus.
pub const DEFAULT_DUCK_VOLUME: f32 = 0.1;

/// Preference namespace used for persisted playback values.
pub const DEFAULT_PREFERENCE_NAMESPACE: &str = "player";

/// Identity used for audio focus requests.
pub const DEFAULT_FOCUS_CLIENT_ID: &str = "single-track-player";

const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Player configuration.
///
/// Use [`PlayerConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct PlayerConfig {
    /// Source loaded when play is requested without an active handle.
    pub default_source: String,

    /// Prefix for keys written to the settings store.
    pub preference_namespace: String,

    /// Identity passed to the focus manager.
    pub focus_client_id: String,

    /// Period of the position poller.
    pub poll_interval: Duration,

    /// Volume used while ducked (`0.0..=1.0`).
    pub duck_volume: f32,

    /// Metadata published to the media session for the single track.
    pub track: TrackMetadata,

    /// Capacity of the event bus channel.
    pub event_buffer_size: usize,

    pub media_player_factory: Arc<dyn MediaPlayerFactory>,

    pub focus_manager: Arc<dyn AudioFocusManager>,

    pub settings_store: Arc<dyn SettingsStore>,

    pub session_presenter: Arc<dyn MediaSessionPresenter>,

    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for PlayerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerConfig")
            .field("default_source", &self.default_source)
            .field("preference_namespace", &self.preference_namespace)
            .field("focus_client_id", &self.focus_client_id)
            .field("poll_interval", &self.poll_interval)
            .field("duck_volume", &self.duck_volume)
            .field("track", &self.track.title)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("media_player_factory", &"MediaPlayerFactory { ... }")
            .field("focus_manager", &"AudioFocusManager { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("session_presenter", &"MediaSessionPresenter { ... }")
            .field(
                "network_monitor",
                &self.network_monitor.as_ref().map(|_| "NetworkMonitor { ... }"),
            )
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags for optional behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Seek to the persisted position once a new handle is prepared.
    pub resume_saved_position: bool,

    /// Refuse to create a handle while the network monitor reports offline.
    /// Requires a `NetworkMonitor`.
    pub require_network: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            resume_saved_position: true,
            require_network: false,
        }
    }
}

/// Placeholder metadata for the single hardcoded track.
pub fn default_track_metadata() -> TrackMetadata {
    TrackMetadata {
        title: "Song Name".to_string(),
        artist: "Artist Name".to_string(),
        album: "Album Name".to_string(),
        duration_ms: None,
        artwork: None,
    }
}

impl PlayerConfig {
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Default source and namespace are not empty
    /// - Poll interval is within `(0, 10s]`
    /// - Duck volume is within `0.0..=1.0`
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.default_source.trim().is_empty() {
            return Err(Error::Config("Default source cannot be empty".to_string()));
        }

        if self.preference_namespace.trim().is_empty() {
            return Err(Error::Config(
                "Preference namespace cannot be empty".to_string(),
            ));
        }

        if self.focus_client_id.trim().is_empty() {
            return Err(Error::Config("Focus client id cannot be empty".to_string()));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.poll_interval > MAX_POLL_INTERVAL {
            return Err(Error::Config(format!(
                "Poll interval exceeds maximum of {}s",
                MAX_POLL_INTERVAL.as_secs()
            )));
        }

        if !(0.0..=1.0).contains(&self.duck_volume) {
            return Err(Error::Config(format!(
                "Duck volume must be within 0.0..=1.0, got {}",
                self.duck_volume
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.features.require_network && self.network_monitor.is_none() {
            return Err(Error::Config(
                "Network gating enabled but no NetworkMonitor provided. \
                 Disable require_network or inject a NetworkMonitor implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn media_player_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaPlayerFactory".to_string(),
        message: "A MediaPlayerFactory is required to create decoder handles. \
                 Desktop: inject bridge_desktop::ClockedMediaPlayerFactory or an audio-engine adapter. \
                 Android: wrap android.media.MediaPlayer. \
                 iOS: wrap AVPlayer."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn focus_manager_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioFocusManager".to_string(),
        message: "An AudioFocusManager is required before playback may start. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default LocalAudioFocusManager. \
                 Android: wrap AudioManager focus requests. \
                 iOS: wrap AVAudioSession activation."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for position persistence. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default SqliteSettingsStore. \
                 Mobile: inject platform-native settings (SharedPreferences/UserDefaults)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_focus_manager() -> Result<Arc<dyn AudioFocusManager>> {
    use bridge_desktop::LocalAudioFocusManager;

    let manager: Arc<dyn AudioFocusManager> = Arc::new(LocalAudioFocusManager::new());
    Ok(manager)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_focus_manager() -> Result<Arc<dyn AudioFocusManager>> {
    Err(focus_manager_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_presenter() -> Arc<dyn MediaSessionPresenter> {
    Arc::new(bridge_desktop::TracingSessionPresenter::new())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_presenter() -> Arc<dyn MediaSessionPresenter> {
    Arc::new(bridge_traits::NoopSessionPresenter)
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(settings_path: Option<PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Handle, Runtime};

    let path = match settings_path {
        Some(path) => path,
        None => SqliteSettingsStore::default_path().map_err(|e| {
            Error::Config(format!(
                "No settings path provided and no platform data directory available: {}",
                e
            ))
        })?,
    };

    let init_store = |path: PathBuf| -> Result<_> {
        let runtime = Runtime::new().map_err(|e| {
            Error::Internal(format!(
                "Failed to create Tokio runtime for default settings store: {}",
                e
            ))
        })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    // Building a runtime inside a runtime panics; hop to a plain thread.
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(path)?,
    };

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(
    _settings_path: Option<PathBuf>,
) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Builder for constructing [`PlayerConfig`] instances.
///
/// Call [`build()`](PlayerConfigBuilder::build) once all bridges are set.
#[derive(Default)]
pub struct PlayerConfigBuilder {
    default_source: Option<String>,
    preference_namespace: Option<String>,
    focus_client_id: Option<String>,
    poll_interval: Option<Duration>,
    duck_volume: Option<f32>,
    track: Option<TrackMetadata>,
    event_buffer_size: Option<usize>,
    settings_path: Option<PathBuf>,
    media_player_factory: Option<Arc<dyn MediaPlayerFactory>>,
    focus_manager: Option<Arc<dyn AudioFocusManager>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    session_presenter: Option<Arc<dyn MediaSessionPresenter>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    features: FeatureFlags,
}

impl PlayerConfigBuilder {
    /// Sets the source loaded when play is pressed with no active handle.
    ///
    /// # Arguments
    ///
    /// * `uri` - Stream or file URI understood by the host decoder
    pub fn default_source(mut self, uri: impl Into<String>) -> Self {
        self.default_source = Some(uri.into());
        self
    }

    pub fn preference_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.preference_namespace = Some(namespace.into());
        self
    }

    pub fn focus_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.focus_client_id = Some(client_id.into());
        self
    }

    /// Sets the position poller period (default 100 ms).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the volume used on duckable focus loss (default 0.1).
    pub fn duck_volume(mut self, volume: f32) -> Self {
        self.duck_volume = Some(volume);
        self
    }

    pub fn track_metadata(mut self, track: TrackMetadata) -> Self {
        self.track = Some(track);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Location of the default desktop settings database. Ignored when a
    /// settings store is injected.
    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn media_player_factory(mut self, factory: Arc<dyn MediaPlayerFactory>) -> Self {
        self.media_player_factory = Some(factory);
        self
    }

    pub fn focus_manager(mut self, manager: Arc<dyn AudioFocusManager>) -> Self {
        self.focus_manager = Some(manager);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn session_presenter(mut self, presenter: Arc<dyn MediaSessionPresenter>) -> Self {
        self.session_presenter = Some(presenter);
        self
    }

    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Enable or disable restoring the persisted position on initialize.
    pub fn resume_saved_position(mut self, enabled: bool) -> Self {
        self.features.resume_saved_position = enabled;
        self
    }

    /// Enable or disable the connectivity check before creating a handle.
    pub fn require_network(mut self, enabled: bool) -> Self {
        self.features.require_network = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `PlayerConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(PlayerConfig)` on success, or an error if:
    /// - Required bridges are missing (MediaPlayerFactory, AudioFocusManager, SettingsStore)
    /// - Configuration values are invalid
    /// - Feature flags are inconsistent with available bridges
    pub fn build(self) -> Result<PlayerConfig> {
        let media_player_factory = self
            .media_player_factory
            .ok_or_else(media_player_factory_missing_error)?;

        let focus_manager = match self.focus_manager {
            Some(manager) => manager,
            None => provide_default_focus_manager()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.settings_path)?,
        };

        let session_presenter = self
            .session_presenter
            .unwrap_or_else(provide_default_presenter);

        let config = PlayerConfig {
            default_source: self
                .default_source
                .unwrap_or_else(|| DEFAULT_SOURCE_URI.to_string()),
            preference_namespace: self
                .preference_namespace
                .unwrap_or_else(|| DEFAULT_PREFERENCE_NAMESPACE.to_string()),
            focus_client_id: self
                .focus_client_id
                .unwrap_or_else(|| DEFAULT_FOCUS_CLIENT_ID.to_string()),
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            duck_volume: self.duck_volume.unwrap_or(DEFAULT_DUCK_VOLUME),
            track: self.track.unwrap_or_else(default_track_metadata),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            media_player_factory,
            focus_manager,
            settings_store,
            session_presenter,
            network_monitor: self.network_monitor,
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
