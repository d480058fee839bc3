use super::{
    BlockStoreReader, BlockStoreWriter, MessageStoreReader, MessageStoreWriter, StoreError,
};
use alloy_primitives::B256;
use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tessera_types::{BlockLogs, ContractDeploymentData, L1ToL2Message, L2Block, LogKind};

#[derive(Debug, Default)]
struct Inner {
    /// Pending messages in the order their additions appeared on L1.
    pending_messages: Vec<L1ToL2Message>,
    /// Stored blocks. Index `i` holds block `i + 1`.
    blocks: Vec<L2Block>,
    /// Deployment records keyed by L2 block number.
    contract_deployments: HashMap<u64, Vec<ContractDeploymentData>>,
}

/// An in-memory [`ArchiverStore`](super::ArchiverStore) implementation.
///
/// Blocks are appended under a single write lock, so readers observe the
/// chain either before or after a batch, never in between.
#[derive(Debug, Default)]
pub struct MemoryArchiverStore {
    inner: RwLock<Inner>,
}

impl MemoryArchiverStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl MessageStoreReader for MemoryArchiverStore {
    fn get_pending_messages(&self, limit: usize) -> Result<Vec<B256>, StoreError> {
        let inner = self.read()?;
        Ok(inner.pending_messages.iter().take(limit).map(|msg| msg.key).collect())
    }
}

impl MessageStoreWriter for MemoryArchiverStore {
    fn add_pending_message(&self, message: L1ToL2Message) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if let Some(existing) = inner.pending_messages.iter().find(|msg| msg.key == message.key) {
            if *existing == message {
                return Ok(());
            }
            return Err(StoreError::DuplicateMessageKey(message.key));
        }
        inner.pending_messages.push(message);
        Ok(())
    }

    fn cancel_pending_message(&self, key: B256) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        let before = inner.pending_messages.len();
        inner.pending_messages.retain(|msg| msg.key != key);
        Ok(inner.pending_messages.len() < before)
    }

    fn confirm_pending_messages(&self, keys: &[B256]) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.pending_messages.retain(|msg| !keys.contains(&msg.key));
        Ok(())
    }
}

impl BlockStoreReader for MemoryArchiverStore {
    fn get_block_number(&self) -> Result<u64, StoreError> {
        let inner = self.read()?;
        Ok(inner.blocks.len() as u64)
    }

    fn get_blocks(&self, from: u64, limit: usize) -> Result<Vec<L2Block>, StoreError> {
        if from == 0 {
            return Ok(Vec::new());
        }
        let inner = self.read()?;
        let start = (from - 1) as usize;
        if start >= inner.blocks.len() {
            return Ok(Vec::new());
        }
        Ok(inner.blocks[start..].iter().take(limit).cloned().collect())
    }

    fn get_logs(&self, from: u64, to: u64, kind: LogKind) -> Result<Vec<BlockLogs>, StoreError> {
        if from == 0 || to < from {
            return Ok(Vec::new());
        }
        let inner = self.read()?;
        let start = (from - 1) as usize;
        let end = inner.blocks.len().min(to as usize);
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(inner.blocks[start..end].iter().map(|block| block.logs(kind).clone()).collect())
    }

    fn get_contract_deployments(
        &self,
        l2_block_number: u64,
    ) -> Result<Vec<ContractDeploymentData>, StoreError> {
        let inner = self.read()?;
        Ok(inner.contract_deployments.get(&l2_block_number).cloned().unwrap_or_default())
    }
}

impl BlockStoreWriter for MemoryArchiverStore {
    fn append_blocks(&self, blocks: Vec<L2Block>) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let mut expected = inner.blocks.len() as u64 + 1;
        for block in &blocks {
            if block.number != expected {
                return Err(StoreError::BlockOutOfOrder);
            }
            expected += 1;
        }
        inner.blocks.extend(blocks);
        Ok(())
    }

    fn add_contract_deployments(
        &self,
        records: Vec<ContractDeploymentData>,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        for record in records {
            inner.contract_deployments.entry(record.l2_block_number).or_default().push(record);
        }
        Ok(())
    }
}
