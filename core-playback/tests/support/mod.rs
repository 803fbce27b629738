//! Hand-written bridge fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    AudioFocusManager, DecoderEvent, DecoderEventKind, DecoderEventSink, FocusChange,
    FocusChangeSink, FocusRequest, FocusRequestResult, MediaPlayer, MediaPlayerFactory,
    MediaSessionPresenter, NotificationView, PlaybackSessionId, SessionPlaybackState,
    SettingsStore, TrackMetadata,
};
use core_playback::{EventPumps, PlaybackController};
use core_runtime::config::PlayerConfig;
use core_runtime::events::EventBus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const SONG: &str = "https://media.example.com/track.mp3";
pub const FIXED_DURATION_MS: u64 = 200_000;

// ============================================================================
// Media player
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetDataSource(String),
    Prepare,
    Start,
    Pause,
    Stop,
    Seek(u64),
    Volume(f32),
    Release,
}

pub struct FakePlayer {
    session: PlaybackSessionId,
    events: Arc<dyn DecoderEventSink>,
    state: Mutex<FakePlayerState>,
}

#[derive(Default)]
struct FakePlayerState {
    source: String,
    playing: bool,
    position_ms: u64,
    prepared: bool,
    calls: Vec<Call>,
}

impl FakePlayer {
    pub fn session(&self) -> PlaybackSessionId {
        self.session
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Move the playhead as if audio had been playing.
    pub fn set_position(&self, position_ms: u64) {
        self.state.lock().unwrap().position_ms = position_ms;
    }

    /// Report a decoder milestone for this handle.
    pub fn emit(&self, kind: DecoderEventKind) {
        self.events.emit(DecoderEvent::new(self.session, kind));
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl MediaPlayer for FakePlayer {
    fn session(&self) -> PlaybackSessionId {
        self.session
    }

    async fn set_data_source(&self, uri: &str) -> BridgeResult<()> {
        self.record(Call::SetDataSource(uri.to_string()));
        if uri.starts_with("reject:") {
            return Err(BridgeError::InvalidInput(uri.to_string()));
        }
        self.state.lock().unwrap().source = uri.to_string();
        Ok(())
    }

    /// Prepared is reported immediately for http(s) sources; anything else
    /// is reported as a decoder error, like a native decoder would.
    async fn prepare_async(&self) -> BridgeResult<()> {
        self.record(Call::Prepare);
        let ok = {
            let mut state = self.state.lock().unwrap();
            state.prepared = state.source.starts_with("http");
            state.prepared
        };
        if ok {
            self.emit(DecoderEventKind::Prepared);
        } else {
            self.emit(DecoderEventKind::Error {
                what: 1,
                extra: -1004,
            });
        }
        Ok(())
    }

    async fn start(&self) -> BridgeResult<()> {
        self.record(Call::Start);
        self.state.lock().unwrap().playing = true;
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record(Call::Pause);
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.record(Call::Stop);
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    async fn seek_to(&self, position_ms: u64) -> BridgeResult<()> {
        self.record(Call::Seek(position_ms));
        self.state.lock().unwrap().position_ms = position_ms;
        self.emit(DecoderEventKind::SeekCompleted { position_ms });
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> BridgeResult<()> {
        self.record(Call::Volume(volume));
        Ok(())
    }

    async fn release(&self) -> BridgeResult<()> {
        self.record(Call::Release);
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.prepared = false;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    fn current_position_ms(&self) -> u64 {
        self.state.lock().unwrap().position_ms
    }

    fn duration_ms(&self) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .prepared
            .then_some(FIXED_DURATION_MS)
    }
}

#[derive(Default)]
pub struct FakePlayerFactory {
    players: Mutex<Vec<Arc<FakePlayer>>>,
}

impl FakePlayerFactory {
    pub fn created(&self) -> usize {
        self.players.lock().unwrap().len()
    }

    pub fn last(&self) -> Arc<FakePlayer> {
        self.players
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no player created yet")
    }

    pub fn nth(&self, index: usize) -> Arc<FakePlayer> {
        self.players.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl MediaPlayerFactory for FakePlayerFactory {
    async fn create(
        &self,
        session: PlaybackSessionId,
        events: Arc<dyn DecoderEventSink>,
    ) -> BridgeResult<Arc<dyn MediaPlayer>> {
        let player = Arc::new(FakePlayer {
            session,
            events,
            state: Mutex::new(FakePlayerState::default()),
        });
        self.players.lock().unwrap().push(player.clone());
        Ok(player as Arc<dyn MediaPlayer>)
    }
}

// ============================================================================
// Audio focus
// ============================================================================

pub struct ScriptedFocus {
    answer: Mutex<FocusRequestResult>,
    listener: Mutex<Option<Arc<dyn FocusChangeSink>>>,
    requests: Mutex<usize>,
    abandons: Mutex<usize>,
}

impl ScriptedFocus {
    pub fn granting() -> Self {
        Self::answering(FocusRequestResult::Granted)
    }

    pub fn answering(answer: FocusRequestResult) -> Self {
        Self {
            answer: Mutex::new(answer),
            listener: Mutex::new(None),
            requests: Mutex::new(0),
            abandons: Mutex::new(0),
        }
    }

    pub fn set_answer(&self, answer: FocusRequestResult) {
        *self.answer.lock().unwrap() = answer;
    }

    /// Deliver a focus change to the current requester. Returns `false`
    /// when nobody is registered, e.g. after the request was abandoned.
    pub fn fire(&self, change: FocusChange) -> bool {
        let listener = self.listener.lock().unwrap().clone();
        match listener {
            Some(listener) => {
                listener.on_focus_change(change);
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }

    pub fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }

    pub fn abandons(&self) -> usize {
        *self.abandons.lock().unwrap()
    }
}

#[async_trait]
impl AudioFocusManager for ScriptedFocus {
    async fn request_focus(
        &self,
        _request: &FocusRequest,
        listener: Arc<dyn FocusChangeSink>,
    ) -> BridgeResult<FocusRequestResult> {
        *self.requests.lock().unwrap() += 1;
        *self.listener.lock().unwrap() = Some(listener);
        Ok(*self.answer.lock().unwrap())
    }

    /// Abandoning withdraws the listener, including a parked delayed request.
    async fn abandon_focus(&self, _client_id: &str) -> BridgeResult<()> {
        *self.abandons.lock().unwrap() += 1;
        *self.listener.lock().unwrap() = None;
        Ok(())
    }
}

// ============================================================================
// Settings & presenter
// ============================================================================

#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()> {
        self.set_string(key, &value.to_string()).await
    }

    async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
        Ok(self.raw(key).and_then(|v| v.parse().ok()))
    }

    async fn set_i64(&self, key: &str, value: i64) -> BridgeResult<()> {
        self.set_string(key, &value.to_string()).await
    }

    async fn get_i64(&self, key: &str) -> BridgeResult<Option<i64>> {
        Ok(self.raw(key).and_then(|v| v.parse().ok()))
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn has_key(&self, key: &str) -> BridgeResult<bool> {
        Ok(self.values.lock().unwrap().contains_key(key))
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        let mut keys: Vec<_> = self.values.lock().unwrap().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear_all(&self) -> BridgeResult<()> {
        self.values.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub notification: Mutex<Option<NotificationView>>,
    pub foreground: Mutex<bool>,
    pub notices: Mutex<Vec<String>>,
    pub states: Mutex<Vec<SessionPlaybackState>>,
    pub metadata: Mutex<Option<TrackMetadata>>,
}

impl RecordingPresenter {
    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }

    pub fn has_notification(&self) -> bool {
        self.notification.lock().unwrap().is_some()
    }

    pub fn is_foreground(&self) -> bool {
        *self.foreground.lock().unwrap()
    }

    pub fn last_state(&self) -> Option<SessionPlaybackState> {
        self.states.lock().unwrap().last().cloned()
    }

    pub fn state_count(&self) -> usize {
        self.states.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaSessionPresenter for RecordingPresenter {
    async fn set_metadata(&self, metadata: &TrackMetadata) -> BridgeResult<()> {
        *self.metadata.lock().unwrap() = Some(metadata.clone());
        Ok(())
    }

    async fn set_playback_state(&self, state: &SessionPlaybackState) -> BridgeResult<()> {
        self.states.lock().unwrap().push(state.clone());
        Ok(())
    }

    async fn show_notification(
        &self,
        view: &NotificationView,
        foreground: bool,
    ) -> BridgeResult<()> {
        *self.notification.lock().unwrap() = Some(view.clone());
        *self.foreground.lock().unwrap() = foreground;
        Ok(())
    }

    async fn stop_foreground(&self, remove_notification: bool) -> BridgeResult<()> {
        *self.foreground.lock().unwrap() = false;
        if remove_notification {
            *self.notification.lock().unwrap() = None;
        }
        Ok(())
    }

    async fn show_notice(&self, message: &str) -> BridgeResult<()> {
        self.notices.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: Arc<PlaybackController>,
    pub pumps: EventPumps,
    pub factory: Arc<FakePlayerFactory>,
    pub focus: Arc<ScriptedFocus>,
    pub settings: Arc<MemorySettings>,
    pub presenter: Arc<RecordingPresenter>,
    pub bus: EventBus,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_focus(ScriptedFocus::granting())
    }

    pub fn with_focus(focus: ScriptedFocus) -> Self {
        Self::build(focus, true)
    }

    pub fn with_resume(resume: bool) -> Self {
        Self::build(ScriptedFocus::granting(), resume)
    }

    fn build(focus: ScriptedFocus, resume: bool) -> Self {
        let factory = Arc::new(FakePlayerFactory::default());
        let focus = Arc::new(focus);
        let settings = Arc::new(MemorySettings::default());
        let presenter = Arc::new(RecordingPresenter::default());

        let config = PlayerConfig::builder()
            .default_source(SONG)
            .media_player_factory(factory.clone())
            .focus_manager(focus.clone())
            .settings_store(settings.clone())
            .session_presenter(presenter.clone())
            .resume_saved_position(resume)
            .build()
            .expect("valid config");

        let bus = EventBus::new(256);
        let (controller, pumps) =
            PlaybackController::new(&config, bus.clone()).expect("controller");

        Self {
            controller,
            pumps,
            factory,
            focus,
            settings,
            presenter,
            bus,
        }
    }

    /// Deliver every queued decoder event and focus change.
    pub async fn settle(&mut self) -> usize {
        self.pumps.drain(&self.controller).await
    }

    pub async fn settings_set_position(&self, position_ms: i64) {
        self.settings
            .set_i64("player.current_song_position_ms", position_ms)
            .await
            .unwrap();
    }

    pub fn saved_position(&self) -> Option<u64> {
        self.settings
            .raw("player.current_song_position_ms")
            .and_then(|v| v.parse().ok())
    }
}
