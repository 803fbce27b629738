//! # Single-Track Playback Engine
//!
//! Drives one native decoder handle through its lifecycle and keeps the rest
//! of the host in sync with it.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback state machine ([`controller::PlaybackController`])
//! - Audio focus arbitration ([`focus::AudioFocusArbiter`])
//! - Listener subscriptions for song, play/pause and seek changes ([`notify`])
//! - Position persistence across sessions ([`position`])
//! - Media session and notification projection ([`session`])
//! - Periodic progress sampling ([`poller`])
//!
//! Host callbacks (decoder milestones, focus changes) reach the engine through
//! the channels in [`dispatch`]; nothing runs inside a host callback.

pub mod controller;
pub mod dispatch;
pub mod error;
pub mod focus;
pub mod notify;
pub mod poller;
pub mod position;
pub mod session;
pub mod state;

pub use controller::PlaybackController;
pub use dispatch::{EventPumps, PumpHandle};
pub use error::{PlaybackError, Result};
pub use focus::AudioFocusArbiter;
pub use notify::{
    ListenerId, PlayPauseListener, SeekCompletionListener, SongChangeListener, StateNotifier,
};
pub use poller::{PlaybackProgress, PositionPoller};
pub use position::PositionStore;
pub use session::{notification_view, session_state, SessionPublisher};
pub use state::{format_timestamp, FocusState, PlaybackSnapshot, PlayerState};
