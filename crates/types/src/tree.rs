use alloy_primitives::B256;
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// Identifies one of the logical merkle trees that together make up the
/// world state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MerkleTreeId {
    /// The tree of private data commitments.
    PrivateData,
    /// The tree of spent-note nullifiers.
    Nullifier,
    /// The tree of deployed contract leaves.
    Contract,
    /// The sparse tree of public storage slots.
    PublicData,
    /// The tree of messages bridged from L1.
    L1ToL2Messages,
    /// The tree of historic block roots.
    HistoricBlocks,
}

impl MerkleTreeId {
    /// All tree identifiers, in canonical order.
    pub const ALL: [Self; 6] = [
        Self::PrivateData,
        Self::Nullifier,
        Self::Contract,
        Self::PublicData,
        Self::L1ToL2Messages,
        Self::HistoricBlocks,
    ];
}

/// A snapshot of an append-only merkle tree: its root together with the index
/// the next inserted leaf will occupy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct AppendOnlyTreeSnapshot {
    /// The tree root at the time of the snapshot.
    pub root: B256,
    /// The index the next appended leaf will be placed at.
    pub next_available_leaf_index: u32,
}

impl AppendOnlyTreeSnapshot {
    /// Creates a new [`AppendOnlyTreeSnapshot`].
    pub const fn new(root: B256, next_available_leaf_index: u32) -> Self {
        Self { root, next_available_leaf_index }
    }
}
