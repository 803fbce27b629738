//! # Playback Error Types
//!
//! Error taxonomy of the single-track playback engine.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Notice shown to the user when the decoder rejects the source.
pub const SOURCE_ERROR_NOTICE: &str = "Invalid format or song";

/// Notice shown to the user when the network gate blocks playback.
pub const NETWORK_NOTICE: &str = "Check your internet";

/// Notice shown to the user when audio focus is refused.
pub const FOCUS_DENIED_NOTICE: &str = "Audio is in use by another app";

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The decoder could not open or decode the source.
    #[error("Failed to open audio source: {0}")]
    SourceError(String),

    /// Connectivity check failed before a remote source was loaded.
    #[error("Network unavailable")]
    NetworkUnavailable,

    // ========================================================================
    // Control Errors
    // ========================================================================
    /// The OS refused audio focus; playback was not started.
    #[error("Audio focus denied")]
    FocusDenied,

    /// A command needing a decoder handle arrived while none exists.
    ///
    /// The controller treats this as a silent no-op; it is only surfaced by
    /// the strict helpers used in tests and diagnostics.
    #[error("No playback handle")]
    HandleAbsent,

    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// A host bridge call failed.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if the user should be told about this error.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            PlaybackError::SourceError(_)
                | PlaybackError::FocusDenied
                | PlaybackError::NetworkUnavailable
        )
    }

    /// Short message suitable for a toast, if the error is user-visible.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            PlaybackError::SourceError(_) => Some(SOURCE_ERROR_NOTICE),
            PlaybackError::NetworkUnavailable => Some(NETWORK_NOTICE),
            PlaybackError::FocusDenied => Some(FOCUS_DENIED_NOTICE),
            _ => None,
        }
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(self, PlaybackError::NetworkUnavailable)
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_visible_errors_have_messages() {
        let source = PlaybackError::SourceError("bad header".into());
        assert!(source.is_user_visible());
        assert_eq!(source.user_message(), Some("Invalid format or song"));

        assert_eq!(
            PlaybackError::NetworkUnavailable.user_message(),
            Some("Check your internet")
        );
        assert!(PlaybackError::NetworkUnavailable.is_network_error());
        assert!(PlaybackError::FocusDenied.is_user_visible());
    }

    #[test]
    fn silent_errors() {
        assert!(!PlaybackError::HandleAbsent.is_user_visible());
        assert_eq!(PlaybackError::HandleAbsent.user_message(), None);
        let bridge: PlaybackError = BridgeError::OperationFailed("x".into()).into();
        assert!(!bridge.is_user_visible());
    }
}
