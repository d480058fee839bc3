use async_trait::async_trait;
use std::{
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock},
};
use thiserror::Error;

/// A failure of the synced block pointer store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("synced block store error: {0}")]
pub struct SyncedBlockStoreError(pub String);

/// Durable storage for the number of the last block applied to the world
/// state.
///
/// The pointer is written after every applied block, so whatever backs this
/// trait determines where a restarted synchronizer resumes.
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait SyncedBlockStore: Debug {
    /// Loads the persisted block number, or `None` if nothing was persisted
    /// yet.
    async fn load(&self) -> Result<Option<u64>, SyncedBlockStoreError>;

    /// Persists the given block number.
    async fn save(&self, block_number: u64) -> Result<(), SyncedBlockStoreError>;
}

/// An in-memory [`SyncedBlockStore`].
///
/// Clones share the underlying slot, so a synchronizer constructed from a
/// clone resumes from what a previous one persisted.
#[derive(Debug, Clone, Default)]
pub struct MemorySyncedBlockStore {
    slot: Arc<RwLock<Option<u64>>>,
}

impl MemorySyncedBlockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncedBlockStore for MemorySyncedBlockStore {
    async fn load(&self) -> Result<Option<u64>, SyncedBlockStoreError> {
        Ok(*self.slot.read().unwrap_or_else(PoisonError::into_inner))
    }

    async fn save(&self, block_number: u64) -> Result<(), SyncedBlockStoreError> {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(block_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_the_persisted_pointer() {
        let store = MemorySyncedBlockStore::new();
        assert_eq!(store.load().await.unwrap(), None);

        store.save(7).await.unwrap();
        let clone = store.clone();
        assert_eq!(clone.load().await.unwrap(), Some(7));

        clone.save(8).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(8));
    }
}
