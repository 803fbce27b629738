//! # Playback Controller
//!
//! Owns the single decoder handle and drives its lifecycle:
//!
//! - `initialize` creates a fresh handle and starts asynchronous preparation
//! - decoder callbacks (prepared, seek complete, completion, error) arrive as
//!   [`DecoderEvent`]s through [`handle_decoder_event`](PlaybackController::handle_decoder_event)
//! - every play goes through the focus arbiter first
//! - every play/pause/stop transition notifies listeners, publishes a
//!   [`PlaybackEvent`] and refreshes the media session
//!
//! ## Locking
//!
//! Commands and decoder events are serialized by an async command gate. The
//! observable state sits behind a short-lived `parking_lot` mutex that is
//! never held across an `.await`, so the read accessors are safe from any
//! thread and from inside listener callbacks.

use bridge_traits::{
    DecoderEvent, DecoderEventKind, DecoderEventSink, MediaPlayer, MediaPlayerFactory,
    PlaybackSessionId,
};
use core_runtime::config::PlayerConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::redact_uri;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::dispatch::{decoder_channel, focus_channel, EventPumps};
use crate::error::{PlaybackError, Result, FOCUS_DENIED_NOTICE, SOURCE_ERROR_NOTICE};
use crate::focus::AudioFocusArbiter;
use crate::notify::StateNotifier;
use crate::position::PositionStore;
use crate::session::SessionPublisher;
use crate::state::{PlaybackSnapshot, PlayerState};

/// Mutable controller state. Only touched under the state lock.
struct Inner {
    handle: Option<Arc<dyn MediaPlayer>>,
    session: Option<PlaybackSessionId>,
    source_uri: String,
    state: PlayerState,
    /// Restore position applied once the decoder is prepared.
    pending_seek: Option<u64>,
    /// Last position observed from (or confirmed by) the handle.
    position_ms: u64,
    duration_ms: Option<u64>,
    volume: f32,
}

/// Single-track playback state machine.
pub struct PlaybackController {
    factory: Arc<dyn MediaPlayerFactory>,
    decoder_sink: Arc<dyn DecoderEventSink>,
    focus: AudioFocusArbiter,
    positions: PositionStore,
    session: SessionPublisher,
    notifier: Arc<StateNotifier>,
    bus: EventBus,
    default_source: String,
    resume_saved_position: bool,
    gate: tokio::sync::Mutex<()>,
    inner: Mutex<Inner>,
}

impl PlaybackController {
    /// Build a controller from `config`.
    ///
    /// The returned [`EventPumps`] carry the host callbacks for this
    /// controller and must be spawned (or drained) for preparation, seek
    /// completion and focus changes to take effect.
    pub fn new(config: &PlayerConfig, bus: EventBus) -> Result<(Arc<Self>, EventPumps)> {
        let (decoder_sink, decoder_rx) = decoder_channel();
        let (focus_sink, focus_rx) = focus_channel();

        let focus = AudioFocusArbiter::new(
            Arc::clone(&config.focus_manager),
            config.focus_client_id.clone(),
            focus_sink,
            config.duck_volume,
            bus.clone(),
        )?;

        let controller = Self {
            factory: Arc::clone(&config.media_player_factory),
            decoder_sink,
            focus,
            positions: PositionStore::new(
                Arc::clone(&config.settings_store),
                &config.preference_namespace,
            ),
            session: SessionPublisher::new(
                Arc::clone(&config.session_presenter),
                config.track.clone(),
            ),
            notifier: Arc::new(StateNotifier::new()),
            bus,
            default_source: config.default_source.clone(),
            resume_saved_position: config.features.resume_saved_position,
            gate: tokio::sync::Mutex::new(()),
            inner: Mutex::new(Inner {
                handle: None,
                session: None,
                source_uri: String::new(),
                state: PlayerState::Idle,
                pending_seek: None,
                position_ms: 0,
                duration_ms: None,
                volume: 1.0,
            }),
        };

        Ok((Arc::new(controller), EventPumps::new(decoder_rx, focus_rx)))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn focus(&self) -> &AudioFocusArbiter {
        &self.focus
    }

    pub fn notifier(&self) -> &Arc<StateNotifier> {
        &self.notifier
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn session_publisher(&self) -> &SessionPublisher {
        &self.session
    }

    pub fn default_source(&self) -> &str {
        &self.default_source
    }

    pub fn state(&self) -> PlayerState {
        self.inner.lock().state
    }

    pub fn has_handle(&self) -> bool {
        self.inner.lock().handle.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.handle().map(|h| h.is_playing()).unwrap_or(false)
    }

    /// Position of the live handle, or the last known position without one.
    pub fn current_position_ms(&self) -> u64 {
        let (handle, last) = {
            let inner = self.inner.lock();
            (inner.handle.clone(), inner.position_ms)
        };
        handle.map(|h| h.current_position_ms()).unwrap_or(last)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        let (handle, known) = {
            let inner = self.inner.lock();
            (inner.handle.clone(), inner.duration_ms)
        };
        handle.and_then(|h| h.duration_ms()).or(known)
    }

    pub fn volume(&self) -> f32 {
        self.inner.lock().volume
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let (handle, mut snapshot) = {
            let inner = self.inner.lock();
            (
                inner.handle.clone(),
                PlaybackSnapshot {
                    source_uri: inner.source_uri.clone(),
                    state: inner.state,
                    is_playing: false,
                    position_ms: inner.position_ms,
                    duration_ms: inner.duration_ms,
                    volume: inner.volume,
                    has_handle: inner.handle.is_some(),
                },
            )
        };

        if let Some(handle) = handle {
            snapshot.is_playing = handle.is_playing();
            snapshot.position_ms = handle.current_position_ms();
            snapshot.duration_ms = handle.duration_ms().or(snapshot.duration_ms);
        }
        snapshot
    }

    /// Current session id, if a handle exists.
    pub fn session_id(&self) -> Option<PlaybackSessionId> {
        self.inner.lock().session
    }

    fn handle(&self) -> Option<Arc<dyn MediaPlayer>> {
        self.inner.lock().handle.clone()
    }

    /// Like [`handle`](Self::handle) but reports absence as an error.
    fn require_handle(&self) -> Result<Arc<dyn MediaPlayer>> {
        self.handle().ok_or(PlaybackError::HandleAbsent)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Load `source` into a fresh handle and start preparing it.
    ///
    /// Returns as soon as preparation was requested; playback starts when the
    /// decoder reports it is prepared. Any existing handle is torn down first.
    pub async fn initialize(&self, source: &str) -> Result<()> {
        let _gate = self.gate.lock().await;
        self.initialize_locked(source).await
    }

    /// Toggle between playing and paused, loading the default source when
    /// nothing is loaded.
    pub async fn toggle_play_pause(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        let (state, has_handle) = {
            let inner = self.inner.lock();
            (inner.state, inner.handle.is_some())
        };

        match state {
            PlayerState::Idle | PlayerState::Error => {
                let source = self.default_source.clone();
                self.initialize_locked(&source).await
            }
            _ if !has_handle => {
                let source = self.default_source.clone();
                self.initialize_locked(&source).await
            }
            PlayerState::Preparing => {
                debug!("Toggle ignored while preparing");
                Ok(())
            }
            PlayerState::ReadyPlaying => {
                self.pause_locked(false).await?;
                self.focus.release_focus().await;
                Ok(())
            }
            PlayerState::ReadyPaused => self.play_locked().await,
        }
    }

    /// Seek within the current track. Ignored unless prepared.
    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        let _gate = self.gate.lock().await;

        let handle = match self.require_handle() {
            Ok(handle) => handle,
            Err(e) => {
                debug!(position_ms, error = %e, "Seek ignored");
                return Ok(());
            }
        };
        if !self.state().is_ready() {
            debug!(position_ms, state = %self.state(), "Seek ignored before prepared");
            return Ok(());
        }

        let target = match handle.duration_ms() {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };
        handle.seek_to(target).await?;
        self.inner.lock().position_ms = target;
        debug!(position_ms = target, "Seek requested");

        self.session.refresh_session(&self.snapshot()).await;
        Ok(())
    }

    /// Tear everything down. Persists the position if a handle existed.
    pub async fn release(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        self.release_locked().await;
        Ok(())
    }

    /// Skip forward. There is no playlist, so this only logs.
    pub async fn play_next(&self) -> Result<()> {
        info!("Next requested; single-track player has nothing to skip to");
        Ok(())
    }

    /// Skip back. There is no playlist, so this only logs.
    pub async fn play_previous(&self) -> Result<()> {
        info!("Previous requested; single-track player has nothing to skip to");
        Ok(())
    }

    // ========================================================================
    // Focus-driven commands
    // ========================================================================

    /// Focus came back: load the default source if nothing is loaded,
    /// otherwise resume a paused handle.
    pub async fn resume_after_focus_gain(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        let (state, has_handle) = {
            let inner = self.inner.lock();
            (inner.state, inner.handle.is_some())
        };

        if !has_handle {
            let source = self.default_source.clone();
            return self.initialize_locked(&source).await;
        }
        if state == PlayerState::ReadyPaused {
            return self.play_locked().await;
        }
        Ok(())
    }

    /// Pause for a temporary focus loss, keeping the notification and focus
    /// registration.
    pub async fn pause_for_transient_loss(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        self.pause_locked(false).await
    }

    /// Lower the output volume without pausing.
    pub async fn duck(&self, volume: f32) -> Result<()> {
        let _gate = self.gate.lock().await;
        self.set_volume_locked(volume).await
    }

    pub async fn restore_full_volume(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        self.set_volume_locked(1.0).await
    }

    /// Another app took focus for good: stop and release the handle. The next
    /// toggle loads a fresh one.
    pub async fn stop_for_focus_loss(&self) -> Result<()> {
        let _gate = self.gate.lock().await;

        let Some(handle) = self.take_handle() else {
            debug!("Focus loss without a handle");
            return Ok(());
        };
        let position_ms = handle.current_position_ms();
        self.persist(position_ms).await;

        if let Err(e) = handle.stop().await {
            warn!(error = %e, "Failed to stop handle on focus loss");
        }
        self.emit_stopped(handle.session(), position_ms);
        self.notifier.notify_play_pause(false);
        self.session.stop_foreground(false).await;
        if let Err(e) = handle.release().await {
            warn!(error = %e, "Failed to release handle on focus loss");
        }

        self.transition(PlayerState::Idle);
        self.session.refresh_session(&self.snapshot()).await;
        Ok(())
    }

    // ========================================================================
    // Decoder events
    // ========================================================================

    /// Apply one decoder callback. Events tagged with a session other than
    /// the current one belong to a released handle and are dropped.
    #[instrument(skip(self, event), fields(session = %event.session, kind = ?event.kind))]
    pub async fn handle_decoder_event(&self, event: DecoderEvent) {
        let _gate = self.gate.lock().await;

        if self.inner.lock().session != Some(event.session) {
            debug!(kind = ?event.kind, "Dropping stale decoder event");
            return;
        }

        let result = match event.kind {
            DecoderEventKind::Prepared => self.on_prepared().await,
            DecoderEventKind::SeekCompleted { position_ms } => {
                self.on_seek_completed(event.session, position_ms).await;
                Ok(())
            }
            DecoderEventKind::Completed => {
                self.on_completed(event.session).await;
                Ok(())
            }
            DecoderEventKind::Error { what, extra } => {
                self.enter_error(format!("decoder error (what={what}, extra={extra})"))
                    .await;
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "Decoder event handling failed");
        }
    }

    async fn on_prepared(&self) -> Result<()> {
        let handle = self.require_handle()?;
        if self.state() != PlayerState::Preparing {
            debug!(state = %self.state(), "Prepared outside of preparation");
            return Ok(());
        }

        let duration_ms = handle.duration_ms();
        let pending = {
            let mut inner = self.inner.lock();
            inner.duration_ms = duration_ms;
            inner.pending_seek.take()
        };
        info!(?duration_ms, "Source prepared");
        self.session.publish_metadata(duration_ms).await;

        if let Some(position_ms) = pending.filter(|p| *p > 0) {
            let target = duration_ms.map_or(position_ms, |d| position_ms.min(d));
            debug!(position_ms = target, "Restoring saved position");
            if let Err(e) = handle.seek_to(target).await {
                warn!(position_ms = target, error = %e, "Failed to restore saved position");
            } else {
                self.inner.lock().position_ms = target;
            }
        }

        let result = self.play_locked().await;
        if self.state() == PlayerState::Preparing {
            self.transition(PlayerState::ReadyPaused);
            self.session.refresh_session(&self.snapshot()).await;
        }
        result
    }

    async fn on_seek_completed(&self, session: PlaybackSessionId, position_ms: u64) {
        self.inner.lock().position_ms = position_ms;
        debug!(position_ms, "Seek completed");

        self.notifier.notify_seek_completed(position_ms);
        self.emit(PlaybackEvent::SeekCompleted {
            session_id: session.to_string(),
            position_ms,
        });
        self.session.refresh_session(&self.snapshot()).await;
    }

    async fn on_completed(&self, session: PlaybackSessionId) {
        info!("Track completed");
        if self.state() == PlayerState::ReadyPlaying {
            let position_ms = self.current_position_ms();
            self.inner.lock().position_ms = position_ms;
            self.transition(PlayerState::ReadyPaused);
            self.notifier.notify_play_pause(false);
        }
        self.emit(PlaybackEvent::Completed {
            session_id: session.to_string(),
        });
        self.session.refresh_session(&self.snapshot()).await;

        if let Err(e) = self.play_next().await {
            warn!(error = %e, "Advancing after completion failed");
        }
    }

    // ========================================================================
    // Internals (command gate held)
    // ========================================================================

    async fn initialize_locked(&self, source: &str) -> Result<()> {
        self.teardown_for_reload().await;

        let session = PlaybackSessionId::new();
        info!(%session, source = %redact_uri(source), "Initializing playback");

        let handle = match self
            .factory
            .create(session, Arc::clone(&self.decoder_sink))
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Failed to create decoder handle");
                self.inner.lock().source_uri = source.to_string();
                self.enter_error(e.to_string()).await;
                return Err(PlaybackError::Bridge(e));
            }
        };

        let pending_seek = if self.resume_saved_position {
            self.positions.saved_position_or_none().await
        } else {
            None
        };

        {
            let mut inner = self.inner.lock();
            inner.handle = Some(Arc::clone(&handle));
            inner.session = Some(session);
            inner.source_uri = source.to_string();
            inner.pending_seek = pending_seek;
            inner.position_ms = 0;
            inner.duration_ms = None;
            inner.volume = 1.0;
        }
        self.transition(PlayerState::Preparing);

        let prepared = match handle.set_data_source(source).await {
            Ok(()) => handle.prepare_async().await,
            Err(e) => Err(e),
        };
        if let Err(e) = prepared {
            warn!(error = %e, "Source rejected");
            self.enter_error(e.to_string()).await;
            return Err(PlaybackError::SourceError(e.to_string()));
        }

        self.session.publish_metadata(None).await;
        self.session.refresh_session(&self.snapshot()).await;

        self.notifier.notify_song_changed(source);
        self.emit(PlaybackEvent::SongChanged {
            session_id: session.to_string(),
            source: redact_uri(source),
            title: self.session.track().title,
        });
        Ok(())
    }

    /// Drop the handle of a previous load so a new one can take its place.
    async fn teardown_for_reload(&self) {
        let Some(handle) = self.take_handle() else {
            return;
        };

        let position_ms = handle.current_position_ms();
        if handle.is_playing() {
            self.persist(position_ms).await;
        }
        if let Err(e) = handle.stop().await {
            debug!(error = %e, "Stopping previous handle failed");
        }
        if let Err(e) = handle.release().await {
            warn!(error = %e, "Releasing previous handle failed");
        }
        self.emit_stopped(handle.session(), position_ms);
    }

    /// Start the current handle, asking for focus first. A refusal stops the
    /// controller entirely; a delayed grant leaves it paused.
    async fn play_locked(&self) -> Result<()> {
        let handle = match self.require_handle() {
            Ok(handle) => handle,
            Err(e) => {
                debug!(error = %e, "Play ignored");
                return Ok(());
            }
        };

        if !self.focus.request_focus().await {
            if self.focus.is_grant_pending() {
                // Treated like a transient loss: stay paused, keep the handle
                // and the parked request; the grant resumes playback.
                info!("Audio focus delayed; waiting for the grant");
                self.session.refresh_session(&self.snapshot()).await;
                return Ok(());
            }

            warn!("Audio focus denied; stopping playback");
            self.release_locked().await;
            self.session.show_notice(FOCUS_DENIED_NOTICE).await;
            self.emit(PlaybackEvent::Error {
                session_id: None,
                message: PlaybackError::FocusDenied.to_string(),
                recoverable: true,
            });
            return Err(PlaybackError::FocusDenied);
        }

        handle.start().await?;
        let position_ms = handle.current_position_ms();
        self.inner.lock().position_ms = position_ms;
        self.transition(PlayerState::ReadyPlaying);
        info!(position_ms, "Playback started");

        self.notifier.notify_play_pause(true);
        self.emit(PlaybackEvent::Started {
            session_id: handle.session().to_string(),
            position_ms,
        });
        self.session.refresh_session(&self.snapshot()).await;
        Ok(())
    }

    /// Pause the current handle and persist its position. Focus is kept.
    async fn pause_locked(&self, remove_notification: bool) -> Result<()> {
        let handle = match self.require_handle() {
            Ok(handle) => handle,
            Err(e) => {
                debug!(error = %e, "Pause ignored");
                return Ok(());
            }
        };
        if self.state() != PlayerState::ReadyPlaying {
            debug!(state = %self.state(), "Pause ignored; not playing");
            return Ok(());
        }

        handle.pause().await?;
        let position_ms = handle.current_position_ms();
        self.inner.lock().position_ms = position_ms;
        self.transition(PlayerState::ReadyPaused);
        info!(position_ms, "Playback paused");

        self.persist(position_ms).await;
        self.notifier.notify_play_pause(false);
        self.emit(PlaybackEvent::Paused {
            session_id: handle.session().to_string(),
            position_ms,
        });
        self.session.refresh_session(&self.snapshot()).await;
        self.session.stop_foreground(remove_notification).await;
        Ok(())
    }

    async fn release_locked(&self) {
        if let Some(handle) = self.take_handle() {
            let position_ms = handle.current_position_ms();
            self.persist(position_ms).await;

            if let Err(e) = handle.stop().await {
                debug!(error = %e, "Stopping handle failed");
            }
            self.emit_stopped(handle.session(), position_ms);
            self.notifier.notify_play_pause(false);
            if let Err(e) = handle.release().await {
                warn!(error = %e, "Releasing handle failed");
            }
            info!(position_ms, "Playback released");
        }

        self.transition(PlayerState::Idle);
        self.session.refresh_session(&self.snapshot()).await;
        self.session.stop_foreground(true).await;
        self.focus.release_focus().await;
    }

    /// Decoder error path: the handle is unusable and is released. The
    /// notification stays so the user can retry from it.
    async fn enter_error(&self, reason: String) {
        error!(%reason, "Playback error");
        let was_ready = self.state().is_ready();
        self.transition(PlayerState::Error);
        let (handle, session) = {
            let mut inner = self.inner.lock();
            inner.pending_seek = None;
            (inner.handle.take(), inner.session.take())
        };

        if let Some(handle) = &handle {
            let position_ms = handle.current_position_ms();
            self.inner.lock().position_ms = position_ms;
            // A handle that never prepared has no meaningful position.
            if was_ready {
                self.persist(position_ms).await;
            }
        }

        self.session.show_notice(SOURCE_ERROR_NOTICE).await;
        self.session.stop_foreground(false).await;

        if let Some(handle) = handle {
            if let Err(e) = handle.stop().await {
                debug!(error = %e, "Stopping failed handle failed");
            }
            if let Err(e) = handle.release().await {
                warn!(error = %e, "Releasing failed handle failed");
            }
        }
        self.focus.release_focus().await;

        self.notifier.notify_play_pause(false);
        self.emit(PlaybackEvent::Error {
            session_id: session.map(|s| s.to_string()),
            message: PlaybackError::SourceError(reason).to_string(),
            recoverable: true,
        });
        self.session.refresh_session(&self.snapshot()).await;
    }

    async fn set_volume_locked(&self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }

        let handle = match self.require_handle() {
            Ok(handle) => handle,
            Err(e) => {
                debug!(volume, error = %e, "Volume change ignored");
                return Ok(());
            }
        };

        handle.set_volume(volume).await?;
        let changed = {
            let mut inner = self.inner.lock();
            let changed = (inner.volume - volume).abs() > f32::EPSILON;
            inner.volume = volume;
            changed
        };
        if changed {
            debug!(volume, "Volume changed");
            self.emit(PlaybackEvent::VolumeChanged { volume });
        }
        Ok(())
    }

    /// Take the handle and forget its session, so late events are dropped.
    fn take_handle(&self) -> Option<Arc<dyn MediaPlayer>> {
        let mut inner = self.inner.lock();
        inner.session = None;
        inner.pending_seek = None;
        let handle = inner.handle.take();
        if let Some(handle) = &handle {
            inner.position_ms = handle.current_position_ms();
        }
        handle
    }

    async fn persist(&self, position_ms: u64) {
        if self.positions.save_current_position(position_ms).await {
            self.emit(PlaybackEvent::PositionSaved { position_ms });
        }
    }

    fn transition(&self, to: PlayerState) {
        let (from, session) = {
            let mut inner = self.inner.lock();
            let from = inner.state;
            inner.state = to;
            (from, inner.session)
        };
        if from == to {
            return;
        }

        debug!(%from, %to, "Playback state changed");
        self.emit(PlaybackEvent::StateChanged {
            session_id: session.map(|s| s.to_string()),
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    fn emit_stopped(&self, session: PlaybackSessionId, position_ms: u64) {
        self.emit(PlaybackEvent::Stopped {
            session_id: session.to_string(),
            position_ms,
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.bus.emit(CoreEvent::Playback(event));
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PlaybackController")
            .field("state", &inner.state)
            .field("session", &inner.session)
            .field("has_handle", &inner.handle.is_some())
            .field("position_ms", &inner.position_ms)
            .finish()
    }
}
