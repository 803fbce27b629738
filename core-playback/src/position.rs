//! Playback position persistence.
//!
//! The engine plays a single track, so the position lives in one fixed slot
//! rather than being keyed by source. Loading a different source restores the
//! previous source's position.

use bridge_traits::SettingsStore;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;

/// Key of the position slot inside the preference namespace.
pub const POSITION_KEY: &str = "current_song_position_ms";

/// Stored value meaning "no saved position".
const NO_POSITION: i64 = -1;

/// Reads and writes the persisted playback position.
#[derive(Clone)]
pub struct PositionStore {
    store: Arc<dyn SettingsStore>,
    key: String,
}

impl PositionStore {
    /// Create a store writing `<namespace>.current_song_position_ms`.
    pub fn new(store: Arc<dyn SettingsStore>, namespace: &str) -> Self {
        Self {
            store,
            key: format!("{}.{}", namespace, POSITION_KEY),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist `position_ms`, logging instead of failing.
    ///
    /// Persistence is best-effort: a failing store must never abort a
    /// pause, stop or release. Returns whether the write succeeded.
    pub async fn save_current_position(&self, position_ms: u64) -> bool {
        let value = i64::try_from(position_ms).unwrap_or(i64::MAX);
        match self.store.set_i64(&self.key, value).await {
            Ok(()) => {
                debug!(key = %self.key, position_ms, "Saved playback position");
                true
            }
            Err(e) => {
                warn!(key = %self.key, position_ms, error = %e, "Failed to save playback position");
                false
            }
        }
    }

    /// Last persisted position; `None` when nothing (or the `-1` marker) is
    /// stored.
    pub async fn saved_position(&self) -> Result<Option<u64>> {
        let raw = self.store.get_i64_or(&self.key, NO_POSITION).await?;
        Ok(u64::try_from(raw).ok())
    }

    /// Like [`saved_position`](Self::saved_position) but read failures are
    /// logged and treated as "no saved position".
    pub async fn saved_position_or_none(&self) -> Option<u64> {
        match self.saved_position().await {
            Ok(position) => position,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read saved playback position");
                None
            }
        }
    }

    /// Forget the saved position.
    pub async fn clear(&self) -> Result<()> {
        self.store.delete(&self.key).await?;
        Ok(())
    }
}

impl std::fmt::Debug for PositionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionStore")
            .field("key", &self.key)
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
    use mockall::predicate::eq;

    mock! {
        pub Settings {}

        #[async_trait]
        impl SettingsStore for Settings {
            async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()>;
            async fn get_string(&self, key: &str) -> BridgeResult<Option<String>>;
            async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()>;
            async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>>;
            async fn set_i64(&self, key: &str, value: i64) -> BridgeResult<()>;
            async fn get_i64(&self, key: &str) -> BridgeResult<Option<i64>>;
            async fn get_i64_or(&self, key: &str, default: i64) -> BridgeResult<i64>;
            async fn delete(&self, key: &str) -> BridgeResult<()>;
            async fn has_key(&self, key: &str) -> BridgeResult<bool>;
            async fn list_keys(&self) -> BridgeResult<Vec<String>>;
            async fn clear_all(&self) -> BridgeResult<()>;
        }
    }

    #[tokio::test]
    async fn saves_under_namespaced_key() {
        let mut settings = MockSettings::new();
        settings
            .expect_set_i64()
            .withf(|key, value| key == "player.current_song_position_ms" && *value == 42_000)
            .times(1)
            .returning(|_, _| Ok(()));

        let store = PositionStore::new(Arc::new(settings), "player");
        assert!(store.save_current_position(42_000).await);
    }

    #[tokio::test]
    async fn missing_or_negative_means_no_position() {
        let mut settings = MockSettings::new();
        let mut seq = mockall::Sequence::new();
        settings
            .expect_get_i64_or()
            .with(eq("player.current_song_position_ms"), eq(-1i64))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, default| Ok(default));
        settings
            .expect_get_i64_or()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(7_500));

        let store = PositionStore::new(Arc::new(settings), "player");
        assert_eq!(store.saved_position().await.unwrap(), None);
        assert_eq!(store.saved_position().await.unwrap(), Some(7_500));
    }

    #[tokio::test]
    async fn write_failures_are_swallowed() {
        let mut settings = MockSettings::new();
        settings
            .expect_set_i64()
            .returning(|_, _| Err(BridgeError::DatabaseError("disk full".into())));

        let store = PositionStore::new(Arc::new(settings), "player");
        assert!(!store.save_current_position(1).await);
    }

    #[tokio::test]
    async fn read_failures_degrade_to_none() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_i64_or()
            .returning(|_, _| Err(BridgeError::DatabaseError("locked".into())));

        let store = PositionStore::new(Arc::new(settings), "player");
        assert!(store.saved_position().await.is_err());
        assert_eq!(store.saved_position_or_none().await, None);
    }

    #[tokio::test]
    async fn clear_deletes_key() {
        let mut settings = MockSettings::new();
        settings
            .expect_delete()
            .with(eq("demo.current_song_position_ms"))
            .times(1)
            .returning(|_| Ok(()));

        let store = PositionStore::new(Arc::new(settings), "demo");
        store.clear().await.unwrap();
    }
}
