//! State-change listener registry.
//!
//! UI layers observe the controller through three narrow capabilities. Any
//! number of listeners may subscribe to each; every subscription returns a
//! [`ListenerId`] that removes it again, so a screen that is recreated can
//! rebind without leaking the previous instance.
//!
//! Listeners are invoked synchronously, on whichever task performed the
//! transition, after the controller released its state lock. They may call
//! back into the controller's read accessors but should not block.
//!
//! # Example
//!
//! ```
//! use core_playback::notify::StateNotifier;
//!
//! let notifier = StateNotifier::new();
//! let id = notifier.on_play_pause(|playing: bool| println!("playing: {playing}"));
//! notifier.notify_play_pause(true);
//! assert!(notifier.unsubscribe(id));
//! ```

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Told when a new source was loaded into a fresh handle.
pub trait SongChangeListener: Send + Sync {
    fn on_song_changed(&self, source_uri: &str);
}

/// Told after every play/pause transition, including stops caused by focus
/// loss or decoder errors.
pub trait PlayPauseListener: Send + Sync {
    fn on_play_pause_state_changed(&self, is_playing: bool);
}

/// Told when the decoder confirmed a seek.
pub trait SeekCompletionListener: Send + Sync {
    fn on_seek_completed(&self, position_ms: u64);
}

impl<F> SongChangeListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_song_changed(&self, source_uri: &str) {
        self(source_uri)
    }
}

impl<F> PlayPauseListener for F
where
    F: Fn(bool) + Send + Sync,
{
    fn on_play_pause_state_changed(&self, is_playing: bool) {
        self(is_playing)
    }
}

impl<F> SeekCompletionListener for F
where
    F: Fn(u64) + Send + Sync,
{
    fn on_seek_completed(&self, position_ms: u64) {
        self(position_ms)
    }
}

/// Handle returned by every subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Slot<L> = RwLock<Vec<(ListenerId, L)>>;

/// Subscription list for the three listener capabilities.
#[derive(Default)]
pub struct StateNotifier {
    next_id: AtomicU64,
    song: Slot<Arc<dyn SongChangeListener>>,
    play_pause: Slot<Arc<dyn PlayPauseListener>>,
    seek: Slot<Arc<dyn SeekCompletionListener>>,
}

impl StateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn subscribe_song_changed(&self, listener: Arc<dyn SongChangeListener>) -> ListenerId {
        let id = self.allocate();
        self.song.write().push((id, listener));
        id
    }

    pub fn subscribe_play_pause(&self, listener: Arc<dyn PlayPauseListener>) -> ListenerId {
        let id = self.allocate();
        self.play_pause.write().push((id, listener));
        id
    }

    pub fn subscribe_seek_completed(
        &self,
        listener: Arc<dyn SeekCompletionListener>,
    ) -> ListenerId {
        let id = self.allocate();
        self.seek.write().push((id, listener));
        id
    }

    /// Closure shorthand for [`subscribe_song_changed`](Self::subscribe_song_changed).
    pub fn on_song_changed<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe_song_changed(Arc::new(f))
    }

    /// Closure shorthand for [`subscribe_play_pause`](Self::subscribe_play_pause).
    pub fn on_play_pause<F>(&self, f: F) -> ListenerId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.subscribe_play_pause(Arc::new(f))
    }

    /// Closure shorthand for [`subscribe_seek_completed`](Self::subscribe_seek_completed).
    pub fn on_seek_completed<F>(&self, f: F) -> ListenerId
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.subscribe_seek_completed(Arc::new(f))
    }

    /// Remove a subscription. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        fn remove<L>(slot: &Slot<L>, id: ListenerId) -> bool {
            let mut listeners = slot.write();
            let before = listeners.len();
            listeners.retain(|(existing, _)| *existing != id);
            listeners.len() != before
        }

        remove(&self.song, id) || remove(&self.play_pause, id) || remove(&self.seek, id)
    }

    pub fn clear(&self) {
        self.song.write().clear();
        self.play_pause.write().clear();
        self.seek.write().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.song.read().len() + self.play_pause.read().len() + self.seek.read().len()
    }

    // Dispatch works on a snapshot of the list so a listener may subscribe or
    // unsubscribe from inside its callback.

    pub fn notify_song_changed(&self, source_uri: &str) {
        let listeners: Vec<_> = self.song.read().iter().map(|(_, l)| l.clone()).collect();
        trace!(count = listeners.len(), "Dispatching song change");
        for listener in listeners {
            listener.on_song_changed(source_uri);
        }
    }

    pub fn notify_play_pause(&self, is_playing: bool) {
        let listeners: Vec<_> = self
            .play_pause
            .read()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        trace!(count = listeners.len(), is_playing, "Dispatching play/pause change");
        for listener in listeners {
            listener.on_play_pause_state_changed(is_playing);
        }
    }

    pub fn notify_seek_completed(&self, position_ms: u64) {
        let listeners: Vec<_> = self.seek.read().iter().map(|(_, l)| l.clone()).collect();
        trace!(count = listeners.len(), position_ms, "Dispatching seek completion");
        for listener in listeners {
            listener.on_seek_completed(position_ms);
        }
    }
}

impl std::fmt::Debug for StateNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateNotifier")
            .field("song", &self.song.read().len())
            .field("play_pause", &self.play_pause.read().len())
            .field("seek", &self.seek.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn every_subscriber_is_called() {
        let notifier = StateNotifier::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            notifier.on_play_pause(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        notifier.notify_play_pause(true);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let notifier = StateNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let id = notifier.on_seek_completed(move |pos| sink.lock().unwrap().push(pos));

        notifier.notify_seek_completed(10);
        assert!(notifier.unsubscribe(id));
        notifier.notify_seek_completed(20);

        assert_eq!(*seen.lock().unwrap(), vec![10]);
        assert!(!notifier.unsubscribe(id));
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn ids_are_unique_across_capabilities() {
        let notifier = StateNotifier::new();
        let a = notifier.on_song_changed(|_| {});
        let b = notifier.on_play_pause(|_| {});
        let c = notifier.on_seek_completed(|_| {});
        assert_ne!(a, b);
        assert_ne!(b, c);

        assert!(notifier.unsubscribe(b));
        assert_eq!(notifier.listener_count(), 2);
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_dispatch() {
        let notifier = Arc::new(StateNotifier::new());
        let id_slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

        let inner = notifier.clone();
        let slot = id_slot.clone();
        let id = notifier.on_song_changed(move |_| {
            if let Some(id) = *slot.lock().unwrap() {
                inner.unsubscribe(id);
            }
        });
        *id_slot.lock().unwrap() = Some(id);

        notifier.notify_song_changed("https://example.com/a.mp3");
        assert_eq!(notifier.listener_count(), 0);
    }

    struct Recorder(Mutex<Vec<String>>);

    impl SongChangeListener for Recorder {
        fn on_song_changed(&self, source_uri: &str) {
            self.0.lock().unwrap().push(source_uri.to_string());
        }
    }

    #[test]
    fn trait_objects_subscribe_directly() {
        let notifier = StateNotifier::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        notifier.subscribe_song_changed(recorder.clone());

        notifier.notify_song_changed("a");
        notifier.notify_song_changed("b");
        assert_eq!(*recorder.0.lock().unwrap(), vec!["a", "b"]);
    }
}
