use crate::{SyncedBlockStoreError, TreeDbError};
use tessera_types::L2BlockSourceError;
use thiserror::Error;

/// Errors that may occur while synchronizing the world state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldStateError {
    /// The synchronizer is not in a state that accepts sync requests.
    #[error("world state is not running, unable to perform sync")]
    NotRunning,

    /// The synchronizer was stopped and cannot be restarted.
    #[error("world state has been stopped and cannot be restarted")]
    AlreadyStopped,

    /// An immediate sync did not reach the requested block.
    #[error("unable to sync to block number {target}, currently synced to block {reached}")]
    UnableToSync {
        /// The block number the sync was asked to reach.
        target: u64,
        /// The block number the sync actually reached.
        reached: u64,
    },

    /// A downloaded block does not extend the applied chain.
    #[error("block {got} does not extend the applied chain, expected block {expected}")]
    NonContiguousBlock {
        /// The block number that would extend the chain.
        expected: u64,
        /// The block number that was downloaded.
        got: u64,
    },

    /// A block source query failed.
    #[error(transparent)]
    Source(#[from] L2BlockSourceError),

    /// The merkle tree database failed to apply a block.
    #[error(transparent)]
    TreeDb(#[from] TreeDbError),

    /// Persisting or loading the synced block pointer failed.
    #[error(transparent)]
    SyncedBlockStore(#[from] SyncedBlockStoreError),
}
