//! Periodic position sampling for progress UIs.
//!
//! The poller reads through the controller only, so it never touches a handle
//! that was released between two ticks. It keeps running while a source is
//! being prepared and ends on its own once playback stops, when cancelled, or
//! when the [`PositionPoller`] is dropped.

use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::controller::PlaybackController;
use crate::state::PlayerState;

/// One progress sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackProgress {
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
}

/// Handle to a running poller task.
#[derive(Debug)]
pub struct PositionPoller {
    token: CancellationToken,
    task: JoinHandle<()>,
    progress: watch::Receiver<PlaybackProgress>,
}

impl PositionPoller {
    /// Start sampling `controller` every `interval`.
    ///
    /// Every sample is published on the watch channel returned by
    /// [`progress`](Self::progress) and as a `PositionChanged` event on `bus`.
    pub fn spawn(controller: Arc<PlaybackController>, interval: Duration, bus: EventBus) -> Self {
        let token = CancellationToken::new();
        let initial = PlaybackProgress {
            position_ms: controller.current_position_ms(),
            duration_ms: controller.duration_ms(),
        };
        let (tx, rx) = watch::channel(initial);

        let task = {
            let token = token.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = token.cancelled() => {
                            debug!("Position poller cancelled");
                            break;
                        }
                        _ = ticker.tick() => {}
                    }

                    let preparing = controller.state() == PlayerState::Preparing;
                    if !controller.has_handle() || !(preparing || controller.is_playing()) {
                        debug!("Position poller stopping; playback not active");
                        break;
                    }

                    let sample = PlaybackProgress {
                        position_ms: controller.current_position_ms(),
                        duration_ms: controller.duration_ms(),
                    };
                    trace!(position_ms = sample.position_ms, "Position sample");

                    if let Some(session) = controller.session_id() {
                        let _ = bus.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
                            session_id: session.to_string(),
                            position_ms: sample.position_ms,
                            duration_ms: sample.duration_ms,
                        }));
                    }
                    tx.send_replace(sample);
                }
            })
        };

        Self {
            token,
            task,
            progress: rx,
        }
    }

    /// Receiver of the latest sample.
    pub fn progress(&self) -> watch::Receiver<PlaybackProgress> {
        self.progress.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the task and wait for it to exit.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Position poller ended abnormally");
        }
    }
}

impl Drop for PositionPoller {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
