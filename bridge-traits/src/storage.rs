//! Preference Storage Abstraction
//!
//! The playback core keeps a handful of small values across process death
//! (most importantly the last playback position). Hosts back this with their
//! native preference facility.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences storage:
/// - Android: SharedPreferences / DataStore
/// - iOS: UserDefaults
/// - Desktop: SQLite-backed table (see `bridge-desktop`)
///
/// Keys are opaque strings. Callers that share one store between components
/// are expected to namespace their keys (e.g. `"player.current_song_position_ms"`).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember_position(store: &dyn SettingsStore, position_ms: u64) -> Result<()> {
///     store.set_i64("player.current_song_position_ms", position_ms as i64).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Store an integer value
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Retrieve an integer value
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Retrieve an integer value, falling back to `default` when the key is
    /// missing.
    async fn get_i64_or(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self.get_i64(key).await?.unwrap_or(default))
    }

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    async fn clear_all(&self) -> Result<()>;
}
