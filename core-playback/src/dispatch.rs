//! Host callback plumbing.
//!
//! Decoder and focus callbacks arrive on host threads at arbitrary times. They
//! are pushed into unbounded channels (a host callback must never block or
//! await) and consumed by two pump tasks that drive the controller and the
//! focus arbiter. Commands and callbacks therefore never interleave mid-step.

use bridge_traits::{DecoderEvent, DecoderEventSink, FocusChange, FocusChangeSink};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::controller::PlaybackController;

/// [`DecoderEventSink`] that forwards into the decoder pump.
#[derive(Debug, Clone)]
pub struct ChannelDecoderSink {
    tx: UnboundedSender<DecoderEvent>,
}

impl DecoderEventSink for ChannelDecoderSink {
    fn emit(&self, event: DecoderEvent) {
        if self.tx.send(event).is_err() {
            trace!("Decoder event dropped; pump stopped");
        }
    }
}

/// [`FocusChangeSink`] that forwards into the focus pump.
#[derive(Debug, Clone)]
pub struct ChannelFocusSink {
    tx: UnboundedSender<FocusChange>,
}

impl FocusChangeSink for ChannelFocusSink {
    fn on_focus_change(&self, change: FocusChange) {
        if self.tx.send(change).is_err() {
            trace!(%change, "Focus change dropped; pump stopped");
        }
    }
}

pub(crate) fn decoder_channel() -> (Arc<ChannelDecoderSink>, UnboundedReceiver<DecoderEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelDecoderSink { tx }), rx)
}

pub(crate) fn focus_channel() -> (Arc<ChannelFocusSink>, UnboundedReceiver<FocusChange>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelFocusSink { tx }), rx)
}

/// Receiving ends of the host callback channels for one controller.
///
/// Either [`spawn`](EventPumps::spawn) them as background tasks, or drive them
/// by hand with [`drain`](EventPumps::drain) for deterministic stepping.
#[derive(Debug)]
pub struct EventPumps {
    decoder: UnboundedReceiver<DecoderEvent>,
    focus: UnboundedReceiver<FocusChange>,
}

impl EventPumps {
    pub(crate) fn new(
        decoder: UnboundedReceiver<DecoderEvent>,
        focus: UnboundedReceiver<FocusChange>,
    ) -> Self {
        Self { decoder, focus }
    }

    /// Process every callback queued so far, focus changes first, then
    /// decoder events. Returns how many callbacks were handled.
    pub async fn drain(&mut self, controller: &PlaybackController) -> usize {
        let mut handled = 0;
        loop {
            if let Ok(change) = self.focus.try_recv() {
                apply_focus_change(controller, change).await;
                handled += 1;
                continue;
            }
            if let Ok(event) = self.decoder.try_recv() {
                controller.handle_decoder_event(event).await;
                handled += 1;
                continue;
            }
            return handled;
        }
    }

    /// Run both pumps as tokio tasks until the returned handle is shut down.
    pub fn spawn(self, controller: Arc<PlaybackController>) -> PumpHandle {
        let token = CancellationToken::new();
        let EventPumps {
            mut decoder,
            mut focus,
        } = self;

        let decoder_task = {
            let controller = Arc::clone(&controller);
            let token = token.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        event = decoder.recv() => match event {
                            Some(event) => controller.handle_decoder_event(event).await,
                            None => break,
                        },
                    }
                }
                debug!("Decoder event pump stopped");
            })
        };

        let focus_task = {
            let token = token.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        change = focus.recv() => match change {
                            Some(change) => apply_focus_change(&controller, change).await,
                            None => break,
                        },
                    }
                }
                debug!("Focus change pump stopped");
            })
        };

        PumpHandle {
            token,
            tasks: vec![decoder_task, focus_task],
        }
    }
}

async fn apply_focus_change(controller: &PlaybackController, change: FocusChange) {
    if let Err(e) = controller.focus().on_focus_changed(change, controller).await {
        warn!(%change, error = %e, "Focus change handling failed");
    }
}

/// Running pump tasks.
#[derive(Debug)]
pub struct PumpHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PumpHandle {
    /// Stop both pumps and wait for them to finish their current step.
    pub async fn shutdown(self) {
        self.token.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Pump task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && self.tasks.iter().any(|t| !t.is_finished())
    }
}
