//! Media Session & Notification Abstraction
//!
//! Hosts surface playback outside the app through a lock-screen style media
//! session and an ongoing notification. The core computes *what* to show (see
//! `core_playback::session`); the host decides *how* to render it.

use serde::{Deserialize, Serialize};
use std::ops::BitOr;

use crate::{error::Result, platform::PlatformSendSync};

/// Transport actions a media session advertises, as a bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SessionActions(u32);

impl SessionActions {
    pub const NONE: SessionActions = SessionActions(0);
    pub const PLAY: SessionActions = SessionActions(1 << 0);
    pub const PAUSE: SessionActions = SessionActions(1 << 1);
    pub const PLAY_PAUSE: SessionActions = SessionActions(1 << 2);
    pub const SKIP_TO_NEXT: SessionActions = SessionActions(1 << 3);
    pub const SKIP_TO_PREVIOUS: SessionActions = SessionActions(1 << 4);
    pub const STOP: SessionActions = SessionActions(1 << 5);
    pub const SEEK_TO: SessionActions = SessionActions(1 << 6);

    /// Everything a single-track player advertises.
    pub const TRANSPORT: SessionActions = SessionActions(
        Self::PLAY.0
            | Self::PAUSE.0
            | Self::PLAY_PAUSE.0
            | Self::SKIP_TO_NEXT.0
            | Self::SKIP_TO_PREVIOUS.0
            | Self::STOP.0
            | Self::SEEK_TO.0,
    );

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: SessionActions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SessionActions {
    type Output = SessionActions;

    fn bitor(self, rhs: Self) -> Self::Output {
        SessionActions(self.0 | rhs.0)
    }
}

/// Coarse playback status shown by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    None,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Error,
}

/// Snapshot pushed to the host media session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlaybackState {
    pub status: SessionStatus,
    pub position_ms: u64,
    /// Playback speed multiplier; 0.0 when not advancing.
    pub speed: f32,
    pub actions: SessionActions,
}

/// Track description shown by the session and notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: Option<u64>,
    /// Encoded artwork bytes, if the source carried any.
    pub artwork: Option<Vec<u8>>,
}

/// Artwork shown in the notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Artwork {
    Embedded(Vec<u8>),
    /// The host's bundled placeholder image.
    Placeholder,
}

/// Icon on the notification's play/pause button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayPauseIcon {
    /// Shown while paused; tapping starts playback.
    Play,
    /// Shown while playing; tapping pauses.
    Pause,
}

/// Actions the notification can send back to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationAction {
    Previous,
    PlayPause,
    Next,
    /// Tap on the notification body.
    OpenUi,
}

/// Idempotent projection of the playback state into notification content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationView {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Artwork,
    pub play_pause_icon: PlayPauseIcon,
    /// Ongoing notifications cannot be swiped away.
    pub ongoing: bool,
    /// Buttons in display order.
    pub actions: Vec<NotificationAction>,
    /// Indices into `actions` shown in the compact layout.
    pub compact_actions: Vec<usize>,
    pub content_action: NotificationAction,
}

/// Host media session and notification presenter.
///
/// Calls arrive after every state change and are fully idempotent: the core
/// always sends the complete view, never a diff.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaSessionPresenter: PlatformSendSync {
    async fn set_metadata(&self, metadata: &TrackMetadata) -> Result<()>;

    async fn set_playback_state(&self, state: &SessionPlaybackState) -> Result<()>;

    /// Post or replace the notification. `foreground` asks the host to tie
    /// the notification to a foreground-service claim.
    async fn show_notification(&self, view: &NotificationView, foreground: bool) -> Result<()>;

    /// Drop the foreground claim, optionally removing the notification.
    async fn stop_foreground(&self, remove_notification: bool) -> Result<()>;

    /// Short user-visible message (toast/snackbar).
    async fn show_notice(&self, message: &str) -> Result<()>;
}

/// Presenter for hosts without a media session.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSessionPresenter;

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl MediaSessionPresenter for NoopSessionPresenter {
    async fn set_metadata(&self, _metadata: &TrackMetadata) -> Result<()> {
        Ok(())
    }

    async fn set_playback_state(&self, _state: &SessionPlaybackState) -> Result<()> {
        Ok(())
    }

    async fn show_notification(&self, _view: &NotificationView, _foreground: bool) -> Result<()> {
        Ok(())
    }

    async fn stop_foreground(&self, _remove_notification: bool) -> Result<()> {
        Ok(())
    }

    async fn show_notice(&self, _message: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_contains_every_action() {
        let all = SessionActions::TRANSPORT;
        for action in [
            SessionActions::PLAY,
            SessionActions::PAUSE,
            SessionActions::PLAY_PAUSE,
            SessionActions::SKIP_TO_NEXT,
            SessionActions::SKIP_TO_PREVIOUS,
            SessionActions::STOP,
            SessionActions::SEEK_TO,
        ] {
            assert!(all.contains(action));
        }
        assert_eq!(all.bits(), 0b111_1111);
    }

    #[test]
    fn bitor_combines() {
        let actions = SessionActions::PLAY | SessionActions::SEEK_TO;
        assert!(actions.contains(SessionActions::PLAY));
        assert!(!actions.contains(SessionActions::STOP));
        assert!(SessionActions::NONE.contains(SessionActions::NONE));
    }
}
