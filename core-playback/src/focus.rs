//! Audio focus arbitration.
//!
//! The arbiter owns the focus request identity and tracks what the host last
//! told us. Focus changes are turned into controller commands by
//! [`AudioFocusArbiter::on_focus_changed`], which receives the controller as
//! an explicit argument; the arbiter never holds a reference to it.

use bridge_traits::{
    AudioFocusManager, FocusChange, FocusChangeSink, FocusRequest, FocusRequestResult,
};
use core_runtime::events::{CoreEvent, EventBus, FocusEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::controller::PlaybackController;
use crate::error::{PlaybackError, Result};
use crate::state::FocusState;

#[derive(Debug)]
struct ArbiterState {
    focus: FocusState,
    ducked: bool,
    /// The host parked our request and owes us a `Gain`.
    grant_pending: bool,
}

/// Requests, tracks and reacts to audio focus.
pub struct AudioFocusArbiter {
    manager: Arc<dyn AudioFocusManager>,
    request: FocusRequest,
    sink: Arc<dyn FocusChangeSink>,
    duck_volume: f32,
    state: Mutex<ArbiterState>,
    bus: EventBus,
}

impl AudioFocusArbiter {
    /// `sink` receives the host's later focus changes for this client.
    pub fn new(
        manager: Arc<dyn AudioFocusManager>,
        client_id: impl Into<String>,
        sink: Arc<dyn FocusChangeSink>,
        duck_volume: f32,
        bus: EventBus,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&duck_volume) {
            return Err(PlaybackError::InvalidVolume(duck_volume));
        }

        Ok(Self {
            manager,
            request: FocusRequest::music(client_id),
            sink,
            duck_volume,
            state: Mutex::new(ArbiterState {
                focus: FocusState::None,
                ducked: false,
                grant_pending: false,
            }),
            bus,
        })
    }

    pub fn state(&self) -> FocusState {
        self.state.lock().focus
    }

    pub fn is_ducked(&self) -> bool {
        self.state.lock().ducked
    }

    /// Whether a delayed request is waiting for the host's `Gain`.
    pub fn is_grant_pending(&self) -> bool {
        self.state.lock().grant_pending
    }

    pub fn duck_volume(&self) -> f32 {
        self.duck_volume
    }

    pub fn client_id(&self) -> &str {
        &self.request.client_id
    }

    /// Ask the host for long-lived music focus.
    ///
    /// Returns `true` only on an immediate grant. A delayed answer returns
    /// `false` and leaves the request parked with the host; the grant arrives
    /// later as [`FocusChange::Gain`]. While parked, further calls return
    /// `false` without asking again. Host errors count as a refusal.
    pub async fn request_focus(&self) -> bool {
        {
            let state = self.state.lock();
            if state.focus == FocusState::Granted {
                return true;
            }
            if state.grant_pending {
                debug!(client_id = %self.request.client_id, "Focus grant still pending");
                return false;
            }
        }

        let result = match self
            .manager
            .request_focus(&self.request, Arc::clone(&self.sink))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(client_id = %self.request.client_id, error = %e, "Audio focus request failed");
                return false;
            }
        };

        info!(client_id = %self.request.client_id, ?result, "Audio focus requested");
        self.emit(FocusEvent::Requested { result });

        let mut state = self.state.lock();
        match result {
            FocusRequestResult::Granted => {
                state.focus = FocusState::Granted;
                state.ducked = false;
                state.grant_pending = false;
                true
            }
            FocusRequestResult::Delayed => {
                state.focus = FocusState::TransientLost;
                state.grant_pending = true;
                false
            }
            FocusRequestResult::Failed => false,
        }
    }

    /// Hand focus back to the host, withdrawing a parked request too. Does
    /// nothing if focus was never requested or was already released.
    pub async fn release_focus(&self) {
        {
            let mut state = self.state.lock();
            if state.focus == FocusState::None {
                return;
            }
            state.focus = FocusState::None;
            state.ducked = false;
            state.grant_pending = false;
        }

        if let Err(e) = self.manager.abandon_focus(&self.request.client_id).await {
            warn!(client_id = %self.request.client_id, error = %e, "Failed to abandon audio focus");
        }
        debug!(client_id = %self.request.client_id, "Audio focus abandoned");
        self.emit(FocusEvent::Abandoned);
    }

    /// React to a host focus change by driving `controller`.
    ///
    /// | change                         | focus state     | controller action            |
    /// |--------------------------------|-----------------|------------------------------|
    /// | `Gain`                         | `Granted`       | resume (or load), full volume |
    /// | `Loss`                         | `PermanentLost` | stop and release the handle  |
    /// | `LossTransient`, `RequestDelayed` | `TransientLost` | pause, keep notification  |
    /// | `LossTransientCanDuck`         | `TransientLost` | lower volume                 |
    pub async fn on_focus_changed(
        &self,
        change: FocusChange,
        controller: &PlaybackController,
    ) -> Result<()> {
        info!(%change, "Audio focus changed");
        self.emit(FocusEvent::Changed { change });

        match change {
            FocusChange::Gain => {
                self.set_state(FocusState::Granted, false);
                controller.resume_after_focus_gain().await?;
                controller.restore_full_volume().await
            }
            FocusChange::Loss => {
                self.set_state(FocusState::PermanentLost, false);
                controller.stop_for_focus_loss().await
            }
            FocusChange::LossTransient | FocusChange::RequestDelayed => {
                self.set_state(FocusState::TransientLost, false);
                controller.pause_for_transient_loss().await
            }
            FocusChange::LossTransientCanDuck => {
                self.set_state(FocusState::TransientLost, true);
                controller.duck(self.duck_volume).await
            }
        }
    }

    fn set_state(&self, focus: FocusState, ducked: bool) {
        let mut state = self.state.lock();
        state.focus = focus;
        state.ducked = ducked;
        state.grant_pending = false;
    }

    fn emit(&self, event: FocusEvent) {
        let _ = self.bus.emit(CoreEvent::Focus(event));
    }
}

impl std::fmt::Debug for AudioFocusArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFocusArbiter")
            .field("client_id", &self.request.client_id)
            .field("state", &*self.state.lock())
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
        pub FocusManager {}

        #[async_trait]
        impl AudioFocusManager for FocusManager {
            async fn request_focus(
                &self,
                request: &FocusRequest,
                listener: Arc<dyn FocusChangeSink>,
            ) -> BridgeResult<FocusRequestResult>;
            async fn abandon_focus(&self, client_id: &str) -> BridgeResult<()>;
        }
    }

    struct NullSink;

    impl FocusChangeSink for NullSink {
        fn on_focus_change(&self, _change: FocusChange) {}
    }

    fn arbiter(manager: MockFocusManager) -> AudioFocusArbiter {
        AudioFocusArbiter::new(
            Arc::new(manager),
            "test-player",
            Arc::new(NullSink),
            0.1,
            EventBus::new(16),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn granted_request_is_cached() {
        let mut manager = MockFocusManager::new();
        manager
            .expect_request_focus()
            .withf(|request, _| request.client_id == "test-player" && request.accepts_delayed_gain)
            .times(1)
            .returning(|_, _| Ok(FocusRequestResult::Granted));

        let arbiter = arbiter(manager);
        assert!(arbiter.request_focus().await);
        assert!(arbiter.request_focus().await);
        assert_eq!(arbiter.state(), FocusState::Granted);
    }

    #[tokio::test]
    async fn failed_and_errors_are_refusals() {
        let mut manager = MockFocusManager::new();
        let mut seq = mockall::Sequence::new();
        manager
            .expect_request_focus()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(FocusRequestResult::Failed));
        manager
            .expect_request_focus()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(BridgeError::NotAvailable("audio service".into())));

        let arbiter = arbiter(manager);
        assert!(!arbiter.request_focus().await);
        assert!(!arbiter.request_focus().await);
        assert_eq!(arbiter.state(), FocusState::None);
        assert!(!arbiter.is_grant_pending());
    }

    #[tokio::test]
    async fn delayed_request_stays_parked() {
        let mut manager = MockFocusManager::new();
        manager
            .expect_request_focus()
            .times(1)
            .returning(|_, _| Ok(FocusRequestResult::Delayed));
        manager
            .expect_abandon_focus()
            .times(1)
            .returning(|_| Ok(()));

        let arbiter = arbiter(manager);
        assert!(!arbiter.request_focus().await);
        assert_eq!(arbiter.state(), FocusState::TransientLost);
        assert!(arbiter.is_grant_pending());

        // Asking again while parked does not re-request.
        assert!(!arbiter.request_focus().await);

        arbiter.release_focus().await;
        assert!(!arbiter.is_grant_pending());
        assert_eq!(arbiter.state(), FocusState::None);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let mut manager = MockFocusManager::new();
        manager
            .expect_request_focus()
            .returning(|_, _| Ok(FocusRequestResult::Granted));
        manager
            .expect_abandon_focus()
            .withf(|id| id == "test-player")
            .times(1)
            .returning(|_| Ok(()));

        let arbiter = arbiter(manager);
        arbiter.release_focus().await;

        assert!(arbiter.request_focus().await);
        arbiter.release_focus().await;
        arbiter.release_focus().await;
        assert_eq!(arbiter.state(), FocusState::None);
    }

    #[tokio::test]
    async fn requests_are_published() {
        let mut manager = MockFocusManager::new();
        manager
            .expect_request_focus()
            .returning(|_, _| Ok(FocusRequestResult::Granted));

        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let arbiter =
            AudioFocusArbiter::new(Arc::new(manager), "p", Arc::new(NullSink), 0.2, bus).unwrap();

        arbiter.request_focus().await;
        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Focus(FocusEvent::Requested {
                result: FocusRequestResult::Granted
            })
        );
    }

    #[test]
    fn rejects_out_of_range_duck_volume() {
        let result = AudioFocusArbiter::new(
            Arc::new(MockFocusManager::new()),
            "p",
            Arc::new(NullSink),
            1.5,
            EventBus::new(4),
        );
        assert!(matches!(result, Err(PlaybackError::InvalidVolume(v)) if v == 1.5));
    }
}
