//! Clock-driven Media Player
//!
//! A silent [`MediaPlayer`] that behaves like a native decoder on a timeline:
//! preparation completes asynchronously, the position advances with the tokio
//! clock while playing, seeks are confirmed through the event sink and the
//! track completes when the clock reaches its duration. It lets the playback
//! core run end to end on desktop and in tests (including with paused tokio
//! time) without an audio device.
//!
//! Sources must be `http`, `https` or `file` URIs. Anything else is reported
//! as a decoder error once preparation runs, the way native decoders reject
//! unsupported input asynchronously.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{
        DecoderEvent, DecoderEventKind, DecoderEventSink, MediaPlayer, MediaPlayerFactory,
        PlaybackSessionId,
    },
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "file"];

/// `what` code reported for sources the player cannot open.
pub const ERROR_UNSUPPORTED: i32 = 1;

/// `extra` code reported for sources the player cannot open.
pub const ERROR_EXTRA_MALFORMED: i32 = -1007;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Initialized,
    Preparing,
    Prepared,
    Stopped,
    Released,
}

#[derive(Debug)]
struct Timeline {
    phase: Phase,
    source: Option<String>,
    playing: bool,
    /// Position at `resumed_at`, or the frozen position while paused.
    base_ms: u64,
    resumed_at: Option<Instant>,
    volume: f32,
    /// Bumped whenever a scheduled completion must not fire anymore.
    generation: u64,
}

impl Timeline {
    fn position(&self, duration_ms: u64) -> u64 {
        let elapsed = match (self.playing, self.resumed_at) {
            (true, Some(at)) => at.elapsed().as_millis() as u64,
            _ => 0,
        };
        self.base_ms.saturating_add(elapsed).min(duration_ms)
    }
}

/// Simulated decoder handle. Create through [`ClockedMediaPlayerFactory`].
pub struct ClockedMediaPlayer {
    session: PlaybackSessionId,
    events: Arc<dyn DecoderEventSink>,
    duration: Duration,
    prepare_delay: Duration,
    timeline: Arc<Mutex<Timeline>>,
}

impl ClockedMediaPlayer {
    fn new(
        session: PlaybackSessionId,
        events: Arc<dyn DecoderEventSink>,
        duration: Duration,
        prepare_delay: Duration,
    ) -> Self {
        Self {
            session,
            events,
            duration,
            prepare_delay,
            timeline: Arc::new(Mutex::new(Timeline {
                phase: Phase::Idle,
                source: None,
                playing: false,
                base_ms: 0,
                resumed_at: None,
                volume: 1.0,
                generation: 0,
            })),
        }
    }

    fn duration_millis(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    pub fn volume(&self) -> f32 {
        self.timeline.lock().volume
    }

    fn ensure_live(timeline: &Timeline) -> Result<()> {
        if timeline.phase == Phase::Released {
            return Err(BridgeError::Released("media player".to_string()));
        }
        Ok(())
    }

    fn ensure_prepared(timeline: &Timeline, op: &str) -> Result<()> {
        Self::ensure_live(timeline)?;
        if timeline.phase != Phase::Prepared {
            return Err(BridgeError::OperationFailed(format!(
                "{} called in state {:?}",
                op, timeline.phase
            )));
        }
        Ok(())
    }

    fn emit(&self, kind: DecoderEventKind) {
        self.events.emit(DecoderEvent::new(self.session, kind));
    }

    /// Schedule the completion event for the current play-through.
    fn schedule_completion(&self, generation: u64, remaining: Duration) {
        let timeline = Arc::clone(&self.timeline);
        let events = Arc::clone(&self.events);
        let session = self.session;
        let duration_ms = self.duration_millis();

        tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            {
                let mut timeline = timeline.lock();
                if timeline.generation != generation || !timeline.playing {
                    return;
                }
                timeline.playing = false;
                timeline.base_ms = duration_ms;
                timeline.resumed_at = None;
            }
            trace!(%session, "Clocked playback reached the end");
            events.emit(DecoderEvent::new(session, DecoderEventKind::Completed));
        });
    }
}

fn is_supported(uri: &str) -> bool {
    match uri.split_once("://") {
        Some((scheme, rest)) => {
            SUPPORTED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) && !rest.is_empty()
        }
        None => false,
    }
}

#[async_trait]
impl MediaPlayer for ClockedMediaPlayer {
    fn session(&self) -> PlaybackSessionId {
        self.session
    }

    async fn set_data_source(&self, uri: &str) -> Result<()> {
        let mut timeline = self.timeline.lock();
        Self::ensure_live(&timeline)?;
        if timeline.phase != Phase::Idle {
            return Err(BridgeError::OperationFailed(
                "data source already set".to_string(),
            ));
        }
        timeline.source = Some(uri.to_string());
        timeline.phase = Phase::Initialized;
        Ok(())
    }

    async fn prepare_async(&self) -> Result<()> {
        let source = {
            let mut timeline = self.timeline.lock();
            Self::ensure_live(&timeline)?;
            if !matches!(timeline.phase, Phase::Initialized | Phase::Stopped) {
                return Err(BridgeError::OperationFailed(format!(
                    "prepare_async called in state {:?}",
                    timeline.phase
                )));
            }
            timeline.phase = Phase::Preparing;
            timeline.source.clone().unwrap_or_default()
        };

        let timeline = Arc::clone(&self.timeline);
        let events = Arc::clone(&self.events);
        let session = self.session;
        let delay = self.prepare_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let supported = is_supported(&source);
            {
                let mut timeline = timeline.lock();
                if timeline.phase != Phase::Preparing {
                    return;
                }
                timeline.phase = if supported {
                    Phase::Prepared
                } else {
                    Phase::Idle
                };
            }

            let kind = if supported {
                DecoderEventKind::Prepared
            } else {
                debug!(%session, "Clocked player rejected source");
                DecoderEventKind::Error {
                    what: ERROR_UNSUPPORTED,
                    extra: ERROR_EXTRA_MALFORMED,
                }
            };
            events.emit(DecoderEvent::new(session, kind));
        });

        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let duration_ms = self.duration_millis();
        let (generation, remaining) = {
            let mut timeline = self.timeline.lock();
            Self::ensure_prepared(&timeline, "start")?;
            if timeline.playing {
                return Ok(());
            }
            if timeline.base_ms >= duration_ms {
                timeline.base_ms = 0;
            }
            timeline.playing = true;
            timeline.resumed_at = Some(Instant::now());
            timeline.generation += 1;
            (
                timeline.generation,
                Duration::from_millis(duration_ms - timeline.base_ms),
            )
        };

        self.schedule_completion(generation, remaining);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let duration_ms = self.duration_millis();
        let mut timeline = self.timeline.lock();
        Self::ensure_prepared(&timeline, "pause")?;
        timeline.base_ms = timeline.position(duration_ms);
        timeline.playing = false;
        timeline.resumed_at = None;
        timeline.generation += 1;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let duration_ms = self.duration_millis();
        let mut timeline = self.timeline.lock();
        Self::ensure_live(&timeline)?;
        timeline.base_ms = timeline.position(duration_ms);
        timeline.playing = false;
        timeline.resumed_at = None;
        timeline.generation += 1;
        timeline.phase = Phase::Stopped;
        Ok(())
    }

    async fn seek_to(&self, position_ms: u64) -> Result<()> {
        let duration_ms = self.duration_millis();
        let target = position_ms.min(duration_ms);
        let restart = {
            let mut timeline = self.timeline.lock();
            Self::ensure_prepared(&timeline, "seek_to")?;
            timeline.base_ms = target;
            timeline.generation += 1;
            if timeline.playing {
                timeline.resumed_at = Some(Instant::now());
                Some(timeline.generation)
            } else {
                None
            }
        };

        if let Some(generation) = restart {
            self.schedule_completion(generation, Duration::from_millis(duration_ms - target));
        }
        self.emit(DecoderEventKind::SeekCompleted {
            position_ms: target,
        });
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(BridgeError::InvalidInput(format!(
                "volume {} outside 0.0..=1.0",
                volume
            )));
        }
        let mut timeline = self.timeline.lock();
        Self::ensure_live(&timeline)?;
        timeline.volume = volume;
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        let mut timeline = self.timeline.lock();
        timeline.playing = false;
        timeline.resumed_at = None;
        timeline.generation += 1;
        timeline.phase = Phase::Released;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.timeline.lock().playing
    }

    fn current_position_ms(&self) -> u64 {
        self.timeline.lock().position(self.duration_millis())
    }

    fn duration_ms(&self) -> Option<u64> {
        match self.timeline.lock().phase {
            Phase::Prepared | Phase::Stopped => Some(self.duration_millis()),
            _ => None,
        }
    }
}

/// Factory for [`ClockedMediaPlayer`] handles.
pub struct ClockedMediaPlayerFactory {
    duration: Duration,
    prepare_delay: Duration,
    created: AtomicUsize,
}

impl ClockedMediaPlayerFactory {
    /// Three-minute track, 50 ms preparation.
    pub fn new() -> Self {
        Self {
            duration: Duration::from_secs(180),
            prepare_delay: Duration::from_millis(50),
            created: AtomicUsize::new(0),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_prepare_delay(mut self, delay: Duration) -> Self {
        self.prepare_delay = delay;
        self
    }

    /// Number of handles created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl Default for ClockedMediaPlayerFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaPlayerFactory for ClockedMediaPlayerFactory {
    async fn create(
        &self,
        session: PlaybackSessionId,
        events: Arc<dyn DecoderEventSink>,
    ) -> Result<Arc<dyn MediaPlayer>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        debug!(%session, "Creating clocked media player");
        Ok(Arc::new(ClockedMediaPlayer::new(
            session,
            events,
            self.duration,
            self.prepare_delay,
        )))
    }
}
