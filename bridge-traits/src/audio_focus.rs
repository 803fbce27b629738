//! Audio Focus Abstraction
//!
//! Audio focus is the OS-mediated right to produce audible output. Competing
//! apps (calls, navigation prompts, other players) take it away either
//! permanently or transiently, and the OS reports those changes through the
//! listener registered with the request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{error::Result, platform::PlatformSendSync};

/// Requested focus duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusGain {
    /// Unbounded focus (music playback).
    Gain,
    /// Short-lived focus; previous holder is expected to pause.
    GainTransient,
    /// Short-lived focus; previous holder may keep playing at lower volume.
    GainTransientMayDuck,
}

/// What the audio is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioUsage {
    Media,
    Notification,
    VoiceCommunication,
    Alarm,
}

/// What the audio contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioContentType {
    Music,
    Speech,
    Sonification,
}

/// A focus request as submitted to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusRequest {
    /// Stable identity of the requester; used again to abandon focus.
    pub client_id: String,
    pub gain: FocusGain,
    pub usage: AudioUsage,
    pub content: AudioContentType,
    /// Whether the host may answer [`FocusRequestResult::Delayed`] and grant
    /// focus later through [`FocusChange::Gain`].
    pub accepts_delayed_gain: bool,
}

impl FocusRequest {
    /// Long-lived music playback request with delayed gain accepted.
    pub fn music(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            gain: FocusGain::Gain,
            usage: AudioUsage::Media,
            content: AudioContentType::Music,
            accepts_delayed_gain: true,
        }
    }
}

/// Immediate answer to a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusRequestResult {
    Granted,
    Failed,
    /// Focus will be granted later via [`FocusChange::Gain`].
    Delayed,
}

/// Asynchronous focus change delivered to the current requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusChange {
    Gain,
    /// Permanent loss; another app took over playback.
    Loss,
    /// Temporary loss; focus is expected back.
    LossTransient,
    /// Temporary loss where lowering the volume is acceptable.
    LossTransientCanDuck,
    /// The host parked the request and will grant it later.
    RequestDelayed,
}

impl FocusChange {
    /// Whether this change ends the right to play at full volume.
    pub fn is_loss(self) -> bool {
        !matches!(self, FocusChange::Gain)
    }

    pub fn is_transient(self) -> bool {
        matches!(
            self,
            FocusChange::LossTransient
                | FocusChange::LossTransientCanDuck
                | FocusChange::RequestDelayed
        )
    }
}

impl fmt::Display for FocusChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FocusChange::Gain => "gain",
            FocusChange::Loss => "loss",
            FocusChange::LossTransient => "loss_transient",
            FocusChange::LossTransientCanDuck => "loss_transient_can_duck",
            FocusChange::RequestDelayed => "request_delayed",
        };
        f.write_str(name)
    }
}

/// Receiver for focus changes. Called from host threads; must not block.
pub trait FocusChangeSink: PlatformSendSync {
    fn on_focus_change(&self, change: FocusChange);
}

/// Host audio focus manager.
///
/// # Platform Support
///
/// - **Android**: `AudioManager.requestAudioFocus` with an `AudioFocusRequest`
/// - **iOS**: `AVAudioSession` activation and interruption notifications
/// - **Desktop**: in-process focus stack (see `bridge-desktop`)
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioFocusManager: PlatformSendSync {
    /// Ask for focus. `listener` receives every later change for this client
    /// until focus is abandoned.
    async fn request_focus(
        &self,
        request: &FocusRequest,
        listener: Arc<dyn FocusChangeSink>,
    ) -> Result<FocusRequestResult>;

    /// Give focus back. Abandoning without holding focus is not an error.
    async fn abandon_focus(&self, client_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn music_request_defaults() {
        let request = FocusRequest::music("player");
        assert_eq!(request.gain, FocusGain::Gain);
        assert_eq!(request.usage, AudioUsage::Media);
        assert_eq!(request.content, AudioContentType::Music);
        assert!(request.accepts_delayed_gain);
    }

    #[test]
    fn change_classification() {
        assert!(!FocusChange::Gain.is_loss());
        assert!(FocusChange::Loss.is_loss());
        assert!(!FocusChange::Loss.is_transient());
        assert!(FocusChange::LossTransientCanDuck.is_transient());
        assert!(FocusChange::RequestDelayed.is_transient());
    }
}
