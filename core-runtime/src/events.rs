//! # Event Bus System
//!
//! Provides an event-driven architecture for the playback core using
//! `tokio::sync::broadcast`. The playback controller and focus arbiter publish
//! typed events here; UI layers, analytics and tests subscribe independently.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for playback and focus
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! The bus complements the synchronous listener registry in `core-playback`:
//! listeners are invoked inline at the point of change, bus subscribers
//! observe the same transitions asynchronously and may lag.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐  emit   ┌───────────┐
//! │ PlaybackController ├────────>│           │  subscribe  ┌────────────┐
//! └────────────────────┘         │ EventBus  ├────────────>│ Subscriber │
//! ┌────────────────────┐  emit   │ (broadcast│             └────────────┘
//! │ AudioFocusArbiter  ├────────>│  channel) │
//! └────────────────────┘         └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Playback(PlaybackEvent::Paused {
//!         session_id: "session-1".to_string(),
//!         position_ms: 42_000,
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Playback paused");
//! # }
//! ```

use bridge_traits::audio_focus::{FocusChange, FocusRequestResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Position updates arrive roughly every 100 ms while playing; subscribers
/// that fall more than this many events behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback state machine events
    Playback(PlaybackEvent),
    /// Audio focus events
    Focus(FocusEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Focus(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Focus(FocusEvent::Requested {
                result: FocusRequestResult::Failed,
            }) => EventSeverity::Warning,
            CoreEvent::Focus(FocusEvent::Changed {
                change: FocusChange::Loss,
            }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::SongChanged { .. })
            | CoreEvent::Playback(PlaybackEvent::Started { .. })
            | CoreEvent::Playback(PlaybackEvent::Paused { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to the single-track playback state machine.
///
/// `session_id` identifies the decoder handle lifetime the event belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The controller moved between states (`idle`, `preparing`,
    /// `ready_paused`, `ready_playing`, `error`).
    StateChanged {
        session_id: Option<String>,
        from: String,
        to: String,
    },
    /// A new source was loaded into a fresh handle.
    SongChanged {
        session_id: String,
        /// Source URI with credentials and query string redacted.
        source: String,
        title: String,
    },
    Started {
        session_id: String,
        position_ms: u64,
    },
    Paused {
        session_id: String,
        position_ms: u64,
    },
    /// The handle was stopped (focus loss, teardown, decoder error).
    Stopped {
        session_id: String,
        position_ms: u64,
    },
    /// The stream played to its end.
    Completed { session_id: String },
    /// The decoder confirmed a seek.
    SeekCompleted {
        session_id: String,
        position_ms: u64,
    },
    /// Periodic progress sample from the position poller.
    PositionChanged {
        session_id: String,
        position_ms: u64,
        duration_ms: Option<u64>,
    },
    /// The position slot was written.
    PositionSaved { position_ms: u64 },
    /// Output volume changed (ducking or restore).
    VolumeChanged { volume: f32 },
    Error {
        session_id: Option<String>,
        /// Human-readable error message.
        message: String,
        /// Whether a new `initialize` can recover.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
            PlaybackEvent::SongChanged { .. } => "Song changed",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::SeekCompleted { .. } => "Seek completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::PositionSaved { .. } => "Playback position saved",
            PlaybackEvent::VolumeChanged { .. } => "Volume changed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Focus Events
// ============================================================================

/// Events related to audio focus arbitration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FocusEvent {
    /// The host answered a focus request.
    Requested { result: FocusRequestResult },
    /// The host reported a focus change.
    Changed { change: FocusChange },
    /// Focus was handed back to the host.
    Abandoned,
}

impl FocusEvent {
    fn description(&self) -> &str {
        match self {
            FocusEvent::Requested { .. } => "Audio focus requested",
            FocusEvent::Changed { .. } => "Audio focus changed",
            FocusEvent::Abandoned => "Audio focus abandoned",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are no active subscribers. Publishers in the playback
    /// core ignore that error; nobody listening is a normal condition.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering capabilities.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let focus_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Focus(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events that match `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn paused(position_ms: u64) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::Paused {
            session_id: "s-1".to_string(),
            position_ms,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(paused(0)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = paused(1_000);
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_filter_skips_non_matching() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|e| matches!(e, CoreEvent::Focus(_)));

        bus.emit(paused(5)).ok();
        let focus = CoreEvent::Focus(FocusEvent::Changed {
            change: FocusChange::LossTransient,
        });
        bus.emit(focus.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), focus);
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagging_subscriber() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());
        for i in 0..5 {
            bus.emit(paused(i)).ok();
        }
        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(_)))));
    }

    #[test]
    fn test_severity() {
        let error = CoreEvent::Playback(PlaybackEvent::Error {
            session_id: None,
            message: "Invalid format or song".to_string(),
            recoverable: true,
        });
        assert_eq!(error.severity(), EventSeverity::Error);

        let loss = CoreEvent::Focus(FocusEvent::Changed {
            change: FocusChange::Loss,
        });
        assert_eq!(loss.severity(), EventSeverity::Warning);

        let denied = CoreEvent::Focus(FocusEvent::Requested {
            result: FocusRequestResult::Failed,
        });
        assert_eq!(denied.severity(), EventSeverity::Warning);

        assert_eq!(paused(0).severity(), EventSeverity::Info);
        assert_eq!(
            CoreEvent::Focus(FocusEvent::Abandoned).severity(),
            EventSeverity::Debug
        );
    }

    #[test]
    fn test_event_serialization_shape() {
        let json = serde_json::to_value(paused(7)).unwrap();
        assert_eq!(json["type"], "Playback");
        assert_eq!(json["payload"]["event"], "Paused");
        assert_eq!(json["payload"]["position_ms"], 7);
    }
}
