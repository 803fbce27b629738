//! Media player bridge traits and decoder events.
//!
//! The host owns the native decoder (Android `MediaPlayer`, AVPlayer, a
//! desktop audio engine). The core drives it through [`MediaPlayer`] and learns
//! about asynchronous decoder milestones through [`DecoderEventSink`], which
//! turns the host's callbacks into a closed set of [`DecoderEvent`] values.
//!
//! Every handle is tagged with a [`PlaybackSessionId`]. Events always carry the
//! id of the handle that produced them so the core can discard callbacks that
//! arrive after the handle was replaced.

use crate::{error::Result, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for one decoder handle lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asynchronous decoder milestones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEventKind {
    /// `prepare_async` finished; duration and seeking are now available.
    Prepared,
    /// A previously requested seek has been applied.
    SeekCompleted { position_ms: u64 },
    /// The stream played to its end.
    Completed,
    /// The decoder failed. `what`/`extra` are host-specific diagnostic codes.
    Error { what: i32, extra: i32 },
}

/// A decoder milestone tagged with the handle that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderEvent {
    pub session: PlaybackSessionId,
    pub kind: DecoderEventKind,
}

impl DecoderEvent {
    pub fn new(session: PlaybackSessionId, kind: DecoderEventKind) -> Self {
        Self { session, kind }
    }
}

/// Receiver for decoder callbacks.
///
/// Hosts call [`emit`](DecoderEventSink::emit) from whatever thread their
/// decoder uses. Implementations must not block; the core's implementation
/// forwards into a channel.
pub trait DecoderEventSink: PlatformSendSync {
    fn emit(&self, event: DecoderEvent);
}

/// Handle to one native decoder/player instance.
///
/// Lifecycle: `set_data_source` → `prepare_async` → (`Prepared` event) →
/// `start`/`pause`/`seek_to`... → `stop` → `release`. Calls after `release`
/// should fail with [`BridgeError::Released`](crate::BridgeError::Released).
///
/// The query methods are synchronous and must be cheap; the position poller
/// calls them roughly every 100 ms.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaPlayer: PlatformSendSync {
    /// Identifier this handle stamps on its decoder events.
    fn session(&self) -> PlaybackSessionId;

    /// Point the decoder at a source URI. Fails fast on URIs the host cannot
    /// parse; unreachable or undecodable sources surface later as
    /// [`DecoderEventKind::Error`].
    async fn set_data_source(&self, uri: &str) -> Result<()>;

    /// Begin asynchronous preparation. Returns immediately; completion is
    /// reported through [`DecoderEventKind::Prepared`].
    async fn prepare_async(&self) -> Result<()>;

    /// Begin or resume playback.
    async fn start(&self) -> Result<()>;

    /// Pause playback, keeping the position.
    async fn pause(&self) -> Result<()>;

    /// Stop playback. The handle must be prepared again before it can start.
    async fn stop(&self) -> Result<()>;

    /// Seek to an absolute position. Completion is reported through
    /// [`DecoderEventKind::SeekCompleted`].
    async fn seek_to(&self, position_ms: u64) -> Result<()>;

    /// Set output volume, normalized to `0.0..=1.0`.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Free native resources. Idempotent.
    async fn release(&self) -> Result<()>;

    fn is_playing(&self) -> bool;

    fn current_position_ms(&self) -> u64;

    /// Stream duration, once known.
    fn duration_ms(&self) -> Option<u64>;
}

/// Creates decoder handles.
///
/// # Example
///
/// ```ignore
/// let session = PlaybackSessionId::new();
/// let player = factory.create(session, events.clone()).await?;
/// player.set_data_source("https://example.com/track.mp3").await?;
/// player.prepare_async().await?;
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaPlayerFactory: PlatformSendSync {
    /// Allocate a new handle that reports to `events` using `session`.
    async fn create(
        &self,
        session: PlaybackSessionId,
        events: Arc<dyn DecoderEventSink>,
    ) -> Result<Arc<dyn MediaPlayer>>;
}
