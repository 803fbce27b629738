//! Media Session Presenter for desktop
//!
//! Desktop builds have no lock screen or notification shade wired up, so the
//! presenter logs what would be shown and keeps the latest state for
//! inspection by a UI shell or by tests.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    session::{MediaSessionPresenter, NotificationView, SessionPlaybackState, TrackMetadata},
};
use parking_lot::RwLock;
use tracing::info;

#[derive(Debug, Default, Clone)]
struct PresenterState {
    metadata: Option<TrackMetadata>,
    playback: Option<SessionPlaybackState>,
    notification: Option<NotificationView>,
    foreground: bool,
    notices: Vec<String>,
}

/// [`MediaSessionPresenter`] that records and logs through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSessionPresenter {
    state: RwLock<PresenterState>,
}

impl TracingSessionPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> Option<TrackMetadata> {
        self.state.read().metadata.clone()
    }

    pub fn playback_state(&self) -> Option<SessionPlaybackState> {
        self.state.read().playback.clone()
    }

    /// Notification currently shown, if any.
    pub fn notification(&self) -> Option<NotificationView> {
        self.state.read().notification.clone()
    }

    /// Whether the notification is tied to a foreground claim.
    pub fn is_foreground(&self) -> bool {
        self.state.read().foreground
    }

    /// Every notice shown so far, oldest first.
    pub fn notices(&self) -> Vec<String> {
        self.state.read().notices.clone()
    }
}

#[async_trait]
impl MediaSessionPresenter for TracingSessionPresenter {
    async fn set_metadata(&self, metadata: &TrackMetadata) -> Result<()> {
        info!(
            title = %metadata.title,
            artist = %metadata.artist,
            duration_ms = ?metadata.duration_ms,
            "Session metadata"
        );
        self.state.write().metadata = Some(metadata.clone());
        Ok(())
    }

    async fn set_playback_state(&self, state: &SessionPlaybackState) -> Result<()> {
        self.state.write().playback = Some(state.clone());
        Ok(())
    }

    async fn show_notification(&self, view: &NotificationView, foreground: bool) -> Result<()> {
        info!(
            title = %view.title,
            icon = ?view.play_pause_icon,
            ongoing = view.ongoing,
            foreground,
            "Notification"
        );
        let mut state = self.state.write();
        state.notification = Some(view.clone());
        state.foreground = foreground;
        Ok(())
    }

    async fn stop_foreground(&self, remove_notification: bool) -> Result<()> {
        info!(remove_notification, "Foreground claim dropped");
        let mut state = self.state.write();
        state.foreground = false;
        if remove_notification {
            state.notification = None;
        }
        Ok(())
    }

    async fn show_notice(&self, message: &str) -> Result<()> {
        info!(message, "Notice");
        self.state.write().notices.push(message.to_string());
        Ok(())
    }
}
