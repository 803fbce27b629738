//! In-process Audio Focus Implementation
//!
//! Desktop operating systems have no system-wide audio focus, so players in
//! the same process share a focus stack that mirrors the mobile semantics:
//!
//! - a permanent request takes focus from the current holder for good
//!   (`Loss`), removing it from the stack
//! - a transient request suspends the current holder (`LossTransient` or
//!   `LossTransientCanDuck`), which gets `Gain` back once the transient
//!   holder abandons
//! - while a [`FocusPolicy::Delay`] lock is active, requests accepting
//!   delayed gain are parked and granted when the lock is lifted

use async_trait::async_trait;
use bridge_traits::{
    audio_focus::{
        AudioFocusManager, FocusChange, FocusChangeSink, FocusGain, FocusRequest,
        FocusRequestResult,
    },
    error::Result,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// How new requests are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusPolicy {
    /// Normal arbitration.
    #[default]
    Grant,
    /// Refuse every request, as during a phone call.
    Deny,
    /// Park requests that accept delayed gain; refuse the others.
    Delay,
}

struct Holder {
    client_id: String,
    gain: FocusGain,
    listener: Arc<dyn FocusChangeSink>,
}

#[derive(Default)]
struct FocusStack {
    policy: FocusPolicy,
    /// Top of the stack is the current holder.
    holders: Vec<Holder>,
    delayed: Vec<Holder>,
}

/// Process-local [`AudioFocusManager`].
#[derive(Default)]
pub struct LocalAudioFocusManager {
    stack: Mutex<FocusStack>,
}

impl LocalAudioFocusManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change how future requests are answered. Lifting a `Delay` policy
    /// grants parked requests in arrival order.
    pub fn set_policy(&self, policy: FocusPolicy) {
        let notifications = {
            let mut stack = self.stack.lock();
            let previous = stack.policy;
            stack.policy = policy;
            if previous == FocusPolicy::Delay && policy == FocusPolicy::Grant {
                let parked = std::mem::take(&mut stack.delayed);
                let mut notifications = Vec::new();
                for holder in parked {
                    let listener = Arc::clone(&holder.listener);
                    notifications.extend(Self::push(&mut stack, holder));
                    notifications.push((listener, FocusChange::Gain));
                }
                notifications
            } else {
                Vec::new()
            }
        };
        info!(?policy, "Focus policy changed");
        Self::deliver(notifications);
    }

    /// Client currently holding focus.
    pub fn holder(&self) -> Option<String> {
        self.stack
            .lock()
            .holders
            .last()
            .map(|h| h.client_id.clone())
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.lock().holders.len()
    }

    pub fn pending_delayed(&self) -> usize {
        self.stack.lock().delayed.len()
    }

    /// Put `holder` on top, returning the change owed to the holder it
    /// displaces.
    fn push(stack: &mut FocusStack, holder: Holder) -> Vec<(Arc<dyn FocusChangeSink>, FocusChange)> {
        let mut notifications = Vec::new();
        stack.holders.retain(|h| h.client_id != holder.client_id);

        if let Some(top) = stack.holders.last() {
            let change = match holder.gain {
                FocusGain::Gain => FocusChange::Loss,
                FocusGain::GainTransient => FocusChange::LossTransient,
                FocusGain::GainTransientMayDuck => FocusChange::LossTransientCanDuck,
            };
            notifications.push((Arc::clone(&top.listener), change));
            if change == FocusChange::Loss {
                stack.holders.pop();
            }
        }

        stack.holders.push(holder);
        notifications
    }

    fn deliver(notifications: Vec<(Arc<dyn FocusChangeSink>, FocusChange)>) {
        for (listener, change) in notifications {
            listener.on_focus_change(change);
        }
    }
}

#[async_trait]
impl AudioFocusManager for LocalAudioFocusManager {
    async fn request_focus(
        &self,
        request: &FocusRequest,
        listener: Arc<dyn FocusChangeSink>,
    ) -> Result<FocusRequestResult> {
        let holder = Holder {
            client_id: request.client_id.clone(),
            gain: request.gain,
            listener,
        };

        let (result, notifications) = {
            let mut stack = self.stack.lock();
            match stack.policy {
                FocusPolicy::Deny => (FocusRequestResult::Failed, Vec::new()),
                FocusPolicy::Delay if request.accepts_delayed_gain => {
                    stack.delayed.retain(|h| h.client_id != holder.client_id);
                    stack.delayed.push(holder);
                    (FocusRequestResult::Delayed, Vec::new())
                }
                FocusPolicy::Delay => (FocusRequestResult::Failed, Vec::new()),
                FocusPolicy::Grant => {
                    let notifications = Self::push(&mut stack, holder);
                    (FocusRequestResult::Granted, notifications)
                }
            }
        };

        debug!(client_id = %request.client_id, ?result, "Focus request answered");
        Self::deliver(notifications);
        Ok(result)
    }

    async fn abandon_focus(&self, client_id: &str) -> Result<()> {
        let notifications = {
            let mut stack = self.stack.lock();
            stack.delayed.retain(|h| h.client_id != client_id);

            let was_top = stack
                .holders
                .last()
                .map(|h| h.client_id == client_id)
                .unwrap_or(false);
            stack.holders.retain(|h| h.client_id != client_id);

            match stack.holders.last() {
                Some(next) if was_top => vec![(Arc::clone(&next.listener), FocusChange::Gain)],
                _ => Vec::new(),
            }
        };

        debug!(client_id, "Focus abandoned");
        Self::deliver(notifications);
        Ok(())
    }
}

impl std::fmt::Debug for LocalAudioFocusManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stack = self.stack.lock();
        f.debug_struct("LocalAudioFocusManager")
            .field("policy", &stack.policy)
            .field(
                "holders",
                &stack
                    .holders
                    .iter()
                    .map(|h| h.client_id.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("delayed", &stack.delayed.len())
            .finish()
    }
}
