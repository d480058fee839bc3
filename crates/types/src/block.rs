use crate::{AppendOnlyTreeSnapshot, BlockLogs, ContractData};
use alloy_primitives::{B256, Bytes};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};

/// A write to a public storage slot performed by an L2 block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct PublicDataWrite {
    /// The leaf index of the slot in the public data tree.
    pub leaf_index: B256,
    /// The value written.
    pub new_value: B256,
}

impl PublicDataWrite {
    /// Creates a new [`PublicDataWrite`].
    pub const fn new(leaf_index: B256, new_value: B256) -> Self {
        Self { leaf_index, new_value }
    }
}

/// Failure to decode an [`L2Block`] body from its calldata encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid block body encoding: {0}")]
pub struct BlockDecodeError(#[from] alloy_rlp::Error);

/// An L2 block: the tree snapshots before and after its execution, the new
/// leaves it inserts, and the logs its transactions emitted.
///
/// The whole structure rides inside the calldata of the rollup transaction
/// that committed the block to L1, so it round-trips through
/// [`to_body_bytes`](Self::to_body_bytes) and
/// [`from_body_bytes`](Self::from_body_bytes).
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct L2Block {
    /// The block number. The chain starts at block 1.
    pub number: u64,
    /// Private data tree snapshot before this block.
    pub start_private_data_tree_snapshot: AppendOnlyTreeSnapshot,
    /// Nullifier tree snapshot before this block.
    pub start_nullifier_tree_snapshot: AppendOnlyTreeSnapshot,
    /// Contract tree snapshot before this block.
    pub start_contract_tree_snapshot: AppendOnlyTreeSnapshot,
    /// Public data tree snapshot before this block.
    pub start_public_data_tree_snapshot: AppendOnlyTreeSnapshot,
    /// L1-to-L2 message tree snapshot before this block.
    pub start_l1_to_l2_message_tree_snapshot: AppendOnlyTreeSnapshot,
    /// Historic blocks tree snapshot before this block.
    pub start_historic_blocks_tree_snapshot: AppendOnlyTreeSnapshot,
    /// Private data tree snapshot after this block.
    pub end_private_data_tree_snapshot: AppendOnlyTreeSnapshot,
    /// Nullifier tree snapshot after this block.
    pub end_nullifier_tree_snapshot: AppendOnlyTreeSnapshot,
    /// Contract tree snapshot after this block.
    pub end_contract_tree_snapshot: AppendOnlyTreeSnapshot,
    /// Public data tree snapshot after this block.
    pub end_public_data_tree_snapshot: AppendOnlyTreeSnapshot,
    /// L1-to-L2 message tree snapshot after this block.
    pub end_l1_to_l2_message_tree_snapshot: AppendOnlyTreeSnapshot,
    /// Historic blocks tree snapshot after this block.
    pub end_historic_blocks_tree_snapshot: AppendOnlyTreeSnapshot,
    /// New private data commitments inserted by this block.
    pub new_commitments: Vec<B256>,
    /// New nullifiers inserted by this block.
    pub new_nullifiers: Vec<B256>,
    /// New contract tree leaves inserted by this block.
    pub new_contracts: Vec<B256>,
    /// Address data for the contracts deployed by this block.
    pub new_contract_data: Vec<ContractData>,
    /// Public storage writes performed by this block.
    pub new_public_data_writes: Vec<PublicDataWrite>,
    /// Keys of the L1-to-L2 messages this block inserts into the message
    /// tree, consuming them from the pending set. Zero keys are padding.
    pub new_l1_to_l2_messages: Vec<B256>,
    /// Messages sent from L2 back to L1 by this block.
    pub new_l2_to_l1_messages: Vec<B256>,
    /// Encrypted logs emitted by this block's transactions.
    pub encrypted_logs: BlockLogs,
    /// Unencrypted logs emitted by this block's transactions.
    pub unencrypted_logs: BlockLogs,
}

impl L2Block {
    /// Creates a block with the given number and no content.
    pub fn empty(number: u64) -> Self {
        Self { number, ..Default::default() }
    }

    /// RLP-encodes the block body for inclusion in rollup calldata.
    pub fn to_body_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.length());
        self.encode(&mut out);
        out.into()
    }

    /// Decodes a block body previously produced by
    /// [`to_body_bytes`](Self::to_body_bytes).
    pub fn from_body_bytes(body: &[u8]) -> Result<Self, BlockDecodeError> {
        Ok(Self::decode(&mut &body[..])?)
    }

    /// The non-padding keys of the L1-to-L2 messages consumed by this block.
    pub fn consumed_message_keys(&self) -> impl Iterator<Item = B256> + '_ {
        self.new_l1_to_l2_messages.iter().copied().filter(|key| !key.is_zero())
    }

    /// The logs of the given kind emitted by this block.
    pub const fn logs(&self, kind: crate::LogKind) -> &BlockLogs {
        match kind {
            crate::LogKind::Encrypted => &self.encrypted_logs,
            crate::LogKind::Unencrypted => &self.unencrypted_logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TxLogs;
    use alloy_primitives::Address;

    fn sample_block() -> L2Block {
        let mut block = L2Block::empty(7);
        block.start_nullifier_tree_snapshot =
            AppendOnlyTreeSnapshot::new(B256::repeat_byte(0x11), 64);
        block.end_nullifier_tree_snapshot =
            AppendOnlyTreeSnapshot::new(B256::repeat_byte(0x12), 128);
        block.new_commitments = vec![B256::repeat_byte(0x21), B256::repeat_byte(0x22)];
        block.new_contract_data =
            vec![ContractData::new(B256::repeat_byte(0x31), Address::repeat_byte(0x32))];
        block.new_public_data_writes =
            vec![PublicDataWrite::new(B256::repeat_byte(0x41), B256::repeat_byte(0x42))];
        block.new_l1_to_l2_messages =
            vec![B256::repeat_byte(0x51), B256::ZERO, B256::repeat_byte(0x52)];
        block.encrypted_logs =
            BlockLogs::new(vec![TxLogs::new(vec![Bytes::from_static(b"secret")])]);
        block
    }

    #[test]
    fn body_round_trips() {
        let block = sample_block();
        let body = block.to_body_bytes();
        let decoded = L2Block::from_body_bytes(&body).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn truncated_body_fails_to_decode() {
        let body = sample_block().to_body_bytes();
        assert!(L2Block::from_body_bytes(&body[..body.len() - 1]).is_err());
        assert!(L2Block::from_body_bytes(&[]).is_err());
    }

    #[test]
    fn consumed_keys_skip_padding() {
        let block = sample_block();
        let keys: Vec<_> = block.consumed_message_keys().collect();
        assert_eq!(keys, vec![B256::repeat_byte(0x51), B256::repeat_byte(0x52)]);
    }
}
