//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides implementations of the playback bridge traits using
//! desktop-appropriate libraries:
//! - `MediaPlayerFactory` producing clock-driven silent players
//! - `AudioFocusManager` as an in-process focus stack
//! - `MediaSessionPresenter` logging through `tracing`
//! - `SettingsStore` using SQLite-backed key-value store
//! - `NetworkMonitor` using a TCP reachability probe
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ClockedMediaPlayerFactory, LocalAudioFocusManager, SqliteSettingsStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let factory = Arc::new(ClockedMediaPlayerFactory::new());
//!     let focus = Arc::new(LocalAudioFocusManager::new());
//!     let settings = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
//!
//!     // Use in core configuration
//! }
//! ```

mod focus;
mod network;
mod player;
mod presenter;
mod settings;

pub use focus::{FocusPolicy, LocalAudioFocusManager};
pub use network::DesktopNetworkMonitor;
pub use player::{
    ClockedMediaPlayer, ClockedMediaPlayerFactory, ERROR_EXTRA_MALFORMED, ERROR_UNSUPPORTED,
};
pub use presenter::TracingSessionPresenter;
pub use settings::SqliteSettingsStore;
