//! Media session and notification projection.
//!
//! The notification is a pure function of the playback snapshot and the track
//! metadata. Every refresh sends the whole view; presenter failures are logged
//! and never interrupt a playback transition.

use bridge_traits::{
    Artwork, MediaSessionPresenter, NotificationAction, NotificationView, PlayPauseIcon,
    SessionActions, SessionPlaybackState, SessionStatus, TrackMetadata,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::state::{PlaybackSnapshot, PlayerState};

/// Builds the notification content for `snapshot`.
///
/// Buttons are always previous, play/pause and next; all three appear in the
/// compact layout. Tapping the body opens the player UI.
pub fn notification_view(snapshot: &PlaybackSnapshot, track: &TrackMetadata) -> NotificationView {
    let artwork = match &track.artwork {
        Some(bytes) if !bytes.is_empty() => Artwork::Embedded(bytes.clone()),
        _ => Artwork::Placeholder,
    };

    NotificationView {
        title: track.title.clone(),
        artist: track.artist.clone(),
        album: track.album.clone(),
        artwork,
        play_pause_icon: if snapshot.is_playing {
            PlayPauseIcon::Pause
        } else {
            PlayPauseIcon::Play
        },
        ongoing: snapshot.is_playing,
        actions: vec![
            NotificationAction::Previous,
            NotificationAction::PlayPause,
            NotificationAction::Next,
        ],
        compact_actions: vec![0, 1, 2],
        content_action: NotificationAction::OpenUi,
    }
}

/// Media session state for `snapshot`.
pub fn session_state(snapshot: &PlaybackSnapshot) -> SessionPlaybackState {
    let status = match snapshot.state {
        PlayerState::Idle => SessionStatus::Stopped,
        PlayerState::Preparing => SessionStatus::Buffering,
        PlayerState::ReadyPaused => SessionStatus::Paused,
        PlayerState::ReadyPlaying => SessionStatus::Playing,
        PlayerState::Error => SessionStatus::Error,
    };

    SessionPlaybackState {
        status,
        position_ms: snapshot.position_ms,
        speed: 1.0,
        actions: SessionActions::TRANSPORT,
    }
}

/// Pushes projections to the host presenter.
pub struct SessionPublisher {
    presenter: Arc<dyn MediaSessionPresenter>,
    track: RwLock<TrackMetadata>,
}

impl SessionPublisher {
    pub fn new(presenter: Arc<dyn MediaSessionPresenter>, track: TrackMetadata) -> Self {
        Self {
            presenter,
            track: RwLock::new(track),
        }
    }

    pub fn track(&self) -> TrackMetadata {
        self.track.read().clone()
    }

    /// Publish the track metadata, filling in the duration once the decoder
    /// reported it.
    pub async fn publish_metadata(&self, duration_ms: Option<u64>) {
        let metadata = {
            let mut track = self.track.write();
            if duration_ms.is_some() {
                track.duration_ms = duration_ms;
            }
            track.clone()
        };

        if let Err(e) = self.presenter.set_metadata(&metadata).await {
            warn!(error = %e, "Failed to publish session metadata");
        }
    }

    /// Push session state and, while a handle exists or the last load
    /// failed, the notification. The foreground claim follows `is_playing`.
    pub async fn refresh_session(&self, snapshot: &PlaybackSnapshot) {
        let state = session_state(snapshot);
        if let Err(e) = self.presenter.set_playback_state(&state).await {
            warn!(error = %e, "Failed to publish session state");
        }

        if snapshot.is_playing {
            self.start_foreground(snapshot).await;
        } else if snapshot.has_handle || snapshot.state == PlayerState::Error {
            self.post_notification(snapshot, false).await;
        }
    }

    /// Post the ongoing notification tied to a foreground claim.
    pub async fn start_foreground(&self, snapshot: &PlaybackSnapshot) {
        self.post_notification(snapshot, true).await;
    }

    async fn post_notification(&self, snapshot: &PlaybackSnapshot, foreground: bool) {
        let view = notification_view(snapshot, &self.track.read());
        debug!(state = %snapshot.state, foreground, "Posting notification");
        if let Err(e) = self.presenter.show_notification(&view, foreground).await {
            warn!(error = %e, "Failed to show notification");
        }
    }

    pub async fn stop_foreground(&self, remove_notification: bool) {
        if let Err(e) = self.presenter.stop_foreground(remove_notification).await {
            warn!(remove_notification, error = %e, "Failed to drop foreground claim");
        }
    }

    pub async fn show_notice(&self, message: &str) {
        if let Err(e) = self.presenter.show_notice(message).await {
            warn!(message, error = %e, "Failed to show notice");
        }
    }
}

impl std::fmt::Debug for SessionPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPublisher")
            .field("track", &self.track.read().title)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::BridgeError;
    use mockall::mock;

    mock! {
        pub Presenter {}

        #[async_trait]
        impl MediaSessionPresenter for Presenter {
            async fn set_metadata(&self, metadata: &TrackMetadata) -> BridgeResult<()>;
            async fn set_playback_state(&self, state: &SessionPlaybackState) -> BridgeResult<()>;
            async fn show_notification(&self, view: &NotificationView, foreground: bool) -> BridgeResult<()>;
            async fn stop_foreground(&self, remove_notification: bool) -> BridgeResult<()>;
            async fn show_notice(&self, message: &str) -> BridgeResult<()>;
        }
    }

    fn track() -> TrackMetadata {
        TrackMetadata {
            title: "Song Name".into(),
            artist: "Artist Name".into(),
            album: "Album Name".into(),
            duration_ms: None,
            artwork: None,
        }
    }

    fn playing() -> PlaybackSnapshot {
        PlaybackSnapshot {
            source_uri: "file:///a.mp3".into(),
            state: PlayerState::ReadyPlaying,
            is_playing: true,
            position_ms: 1_500,
            duration_ms: Some(60_000),
            volume: 1.0,
            has_handle: true,
        }
    }

    #[test]
    fn playing_view_shows_pause_and_is_ongoing() {
        let view = notification_view(&playing(), &track());
        assert_eq!(view.play_pause_icon, PlayPauseIcon::Pause);
        assert!(view.ongoing);
        assert_eq!(view.artwork, Artwork::Placeholder);
        assert_eq!(view.compact_actions, vec![0, 1, 2]);
        assert_eq!(view.actions[1], NotificationAction::PlayPause);
        assert_eq!(view.content_action, NotificationAction::OpenUi);
    }

    #[test]
    fn paused_view_shows_play() {
        let mut snapshot = playing();
        snapshot.state = PlayerState::ReadyPaused;
        snapshot.is_playing = false;

        let mut with_art = track();
        with_art.artwork = Some(vec![1, 2, 3]);

        let view = notification_view(&snapshot, &with_art);
        assert_eq!(view.play_pause_icon, PlayPauseIcon::Play);
        assert!(!view.ongoing);
        assert_eq!(view.artwork, Artwork::Embedded(vec![1, 2, 3]));
    }

    #[test]
    fn projection_is_idempotent() {
        let snapshot = playing();
        assert_eq!(
            notification_view(&snapshot, &track()),
            notification_view(&snapshot, &track())
        );
    }

    #[test]
    fn session_status_follows_state() {
        let mut snapshot = playing();
        assert_eq!(session_state(&snapshot).status, SessionStatus::Playing);
        snapshot.state = PlayerState::Preparing;
        assert_eq!(session_state(&snapshot).status, SessionStatus::Buffering);
        snapshot.state = PlayerState::Error;
        let state = session_state(&snapshot);
        assert_eq!(state.status, SessionStatus::Error);
        assert_eq!(state.actions, SessionActions::TRANSPORT);
        assert_eq!(state.position_ms, 1_500);
    }

    #[tokio::test]
    async fn refresh_claims_foreground_while_playing() {
        let mut presenter = MockPresenter::new();
        presenter.expect_set_playback_state().times(1).returning(|_| Ok(()));
        presenter
            .expect_show_notification()
            .withf(|view, foreground| *foreground && view.ongoing)
            .times(1)
            .returning(|_, _| Ok(()));

        let publisher = SessionPublisher::new(Arc::new(presenter), track());
        publisher.refresh_session(&playing()).await;
    }

    #[tokio::test]
    async fn refresh_without_handle_skips_notification() {
        let mut presenter = MockPresenter::new();
        presenter.expect_set_playback_state().times(1).returning(|_| Ok(()));
        presenter.expect_show_notification().never();

        let publisher = SessionPublisher::new(Arc::new(presenter), track());
        publisher.refresh_session(&PlaybackSnapshot::idle()).await;
    }

    #[tokio::test]
    async fn presenter_failures_are_swallowed() {
        let mut presenter = MockPresenter::new();
        presenter
            .expect_set_metadata()
            .withf(|m| m.duration_ms == Some(90_000))
            .returning(|_| Err(BridgeError::OperationFailed("no session".into())));
        presenter
            .expect_show_notice()
            .returning(|_| Err(BridgeError::NotAvailable("toast".into())));

        let publisher = SessionPublisher::new(Arc::new(presenter), track());
        publisher.publish_metadata(Some(90_000)).await;
        publisher.show_notice("Check your internet").await;
        assert_eq!(publisher.track().duration_ms, Some(90_000));
    }
}
