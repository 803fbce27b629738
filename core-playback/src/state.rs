//! Observable playback state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the single decoder handle.
///
/// ```text
/// Idle ──initialize──> Preparing ──prepared──> ReadyPlaying <──toggle──> ReadyPaused
///   ^                                                │                      │
///   └──────────────── release / focus loss ─────────┴──────────────────────┘
/// any ──decoder error──> Error ──toggle──> Preparing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Idle,
    Preparing,
    ReadyPaused,
    ReadyPlaying,
    Error,
}

impl PlayerState {
    /// Prepared states accept seek and play/pause.
    pub fn is_ready(self) -> bool {
        matches!(self, PlayerState::ReadyPaused | PlayerState::ReadyPlaying)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayerState::Idle => "idle",
            PlayerState::Preparing => "preparing",
            PlayerState::ReadyPaused => "ready_paused",
            PlayerState::ReadyPlaying => "ready_playing",
            PlayerState::Error => "error",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Focus as the arbiter currently understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusState {
    None,
    Granted,
    TransientLost,
    PermanentLost,
}

impl FocusState {
    pub fn allows_playback(self) -> bool {
        matches!(self, FocusState::Granted)
    }
}

/// Point-in-time view of the controller, safe to hand to listeners and UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Source of the current (or last) handle; empty before the first initialize.
    pub source_uri: String,
    pub state: PlayerState,
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub volume: f32,
    pub has_handle: bool,
}

impl PlaybackSnapshot {
    /// Snapshot of a controller that has never loaded a source.
    pub fn idle() -> Self {
        Self {
            source_uri: String::new(),
            state: PlayerState::Idle,
            is_playing: false,
            position_ms: 0,
            duration_ms: None,
            volume: 1.0,
            has_handle: false,
        }
    }

    /// Fraction of the track played, when the duration is known.
    pub fn progress(&self) -> Option<f32> {
        match self.duration_ms {
            Some(0) | None => None,
            Some(duration) => Some((self.position_ms.min(duration) as f32) / duration as f32),
        }
    }
}

/// Formats milliseconds as `mm:ss` (minutes are not wrapped at 60).
///
/// ```
/// use core_playback::state::format_timestamp;
///
/// assert_eq!(format_timestamp(0), "00:00");
/// assert_eq!(format_timestamp(83_999), "01:23");
/// assert_eq!(format_timestamp(3_723_000), "62:03");
/// ```
pub fn format_timestamp(millis: u64) -> String {
    let total_secs = millis / 1_000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
