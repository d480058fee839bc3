//! Storage traits for the data the archiver mirrors from L1, split into
//! reader and writer halves per concern.

use alloy_primitives::B256;
use std::fmt::Debug;
use tessera_types::{BlockLogs, ContractDeploymentData, L1ToL2Message, L2Block, LogKind};
use thiserror::Error;

mod memory;
pub use memory::MemoryArchiverStore;

/// Errors that may occur while interacting with archiver storage.
///
/// This enum is used across all implementations of the store traits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A lock guarding the store was poisoned.
    #[error("lock poisoned")]
    LockPoisoned,

    /// A message was re-added under an existing key with a different payload.
    #[error("conflicting payload for pending message {0}")]
    DuplicateMessageKey(B256),

    /// An appended block does not extend the stored chain.
    #[error("latest stored block is not parent of the incoming block")]
    BlockOutOfOrder,
}

/// Read access to the pending L1-to-L2 message set.
///
/// Implementations are expected to provide thread-safe access.
pub trait MessageStoreReader: Debug {
    /// Gets the keys of up to `limit` pending messages, ordered by the L1
    /// position at which they were added.
    ///
    /// # Arguments
    /// * `limit` - The maximum number of keys to return.
    ///
    /// # Returns
    /// * `Ok(Vec<B256>)` with the pending keys, oldest first.
    /// * `Err(StoreError)` if the store could not be read.
    fn get_pending_messages(&self, limit: usize) -> Result<Vec<B256>, StoreError>;
}

/// Write access to the pending L1-to-L2 message set.
pub trait MessageStoreWriter: Debug {
    /// Adds a message to the pending set.
    ///
    /// Re-adding an identical message is a no-op, so retried sync cycles
    /// converge. Re-adding a key with a different payload fails with
    /// [`StoreError::DuplicateMessageKey`].
    fn add_pending_message(&self, message: L1ToL2Message) -> Result<(), StoreError>;

    /// Removes a message from the pending set after its sender cancelled it.
    ///
    /// # Returns
    /// * `Ok(true)` if the message was pending and has been removed.
    /// * `Ok(false)` if no such message was pending.
    fn cancel_pending_message(&self, key: B256) -> Result<bool, StoreError>;

    /// Removes the given keys from the pending set after an L2 block consumed
    /// them. Keys that are not pending are ignored.
    fn confirm_pending_messages(&self, keys: &[B256]) -> Result<(), StoreError>;
}

/// Read access to the mirrored L2 chain.
pub trait BlockStoreReader: Debug {
    /// Gets the number of the latest stored block, or 0 when the store is
    /// empty.
    fn get_block_number(&self) -> Result<u64, StoreError>;

    /// Gets up to `limit` consecutive blocks starting at `from`.
    ///
    /// # Returns
    /// * `Ok(Vec<L2Block>)` with the stored blocks, possibly fewer than
    ///   `limit` near the tip, empty when `from` is past the tip.
    /// * `Err(StoreError)` if the store could not be read.
    fn get_blocks(&self, from: u64, limit: usize) -> Result<Vec<L2Block>, StoreError>;

    /// Gets the logs of the given kind emitted by blocks `from..=to`, one
    /// bundle per stored block in that range.
    fn get_logs(&self, from: u64, to: u64, kind: LogKind) -> Result<Vec<BlockLogs>, StoreError>;

    /// Gets the contract deployment records announced for the given L2 block.
    fn get_contract_deployments(
        &self,
        l2_block_number: u64,
    ) -> Result<Vec<ContractDeploymentData>, StoreError>;
}

/// Write access to the mirrored L2 chain.
pub trait BlockStoreWriter: Debug {
    /// Appends consecutive blocks to the stored chain.
    ///
    /// The batch is applied atomically: readers observe either none or all of
    /// it. The first block must extend the stored tip and the batch itself
    /// must be contiguous, otherwise [`StoreError::BlockOutOfOrder`] is
    /// returned and nothing is written.
    fn append_blocks(&self, blocks: Vec<L2Block>) -> Result<(), StoreError>;

    /// Records contract deployment announcements, keyed by their L2 block.
    fn add_contract_deployments(
        &self,
        records: Vec<ContractDeploymentData>,
    ) -> Result<(), StoreError>;
}

/// Combines all archiver storage concerns.
pub trait ArchiverStore:
    MessageStoreReader + MessageStoreWriter + BlockStoreReader + BlockStoreWriter
{
}

impl<T> ArchiverStore for T where
    T: MessageStoreReader + MessageStoreWriter + BlockStoreReader + BlockStoreWriter
{
}
