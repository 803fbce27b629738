//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and the host.
//! The core owns the playback state machine and audio focus arbitration; the
//! host owns the native decoder, the OS focus manager, the notification shade
//! and preference storage. Each trait below is one of those capabilities.
//!
//! ## Traits
//!
//! ### Audio
//! - [`MediaPlayerFactory`](playback::MediaPlayerFactory) / [`MediaPlayer`](playback::MediaPlayer) - Native decoder handle
//! - [`DecoderEventSink`](playback::DecoderEventSink) - Decoder callbacks as a closed event set
//! - [`AudioFocusManager`](audio_focus::AudioFocusManager) - OS audio focus requests
//! - [`FocusChangeSink`](audio_focus::FocusChangeSink) - Focus change callbacks
//!
//! ### Presentation
//! - [`MediaSessionPresenter`](session::MediaSessionPresenter) - Media session, notification, user notices
//!
//! ### Platform Integration
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity detection
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Reference adapters |
//! | Android  | TBD                 | 📋 Planned |
//! | iOS      | TBD                 | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! let factory = builder.media_player_factory
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "MediaPlayerFactory".to_string(),
//!         message: "No media player factory provided. \
//!                  Desktop: enable the desktop-shims feature. \
//!                  Mobile: inject the platform decoder adapter.".to_string()
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError` and
//! include context such as the source URI or focus client.
//!
//! ## Thread Safety
//!
//! Decoder and focus callbacks arrive on host threads, so all bridge traits
//! require `Send + Sync` on native targets (see [`platform`]).

pub mod audio_focus;
pub mod error;
pub mod logging;
pub mod network;
pub mod platform;
pub mod playback;
pub mod session;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio_focus::{
    AudioContentType, AudioFocusManager, AudioUsage, FocusChange, FocusChangeSink, FocusGain,
    FocusRequest, FocusRequestResult,
};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use playback::{
    DecoderEvent, DecoderEventKind, DecoderEventSink, MediaPlayer, MediaPlayerFactory,
    PlaybackSessionId,
};
pub use session::{
    Artwork, MediaSessionPresenter, NoopSessionPresenter, NotificationAction, NotificationView,
    PlayPauseIcon, SessionActions, SessionPlaybackState, SessionStatus, TrackMetadata,
};
pub use storage::SettingsStore;
