use alloy_primitives::B256;
use async_trait::async_trait;
use tessera_types::{L2Block, MerkleTreeId};
use thiserror::Error;

/// A failure reported by the merkle tree database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("merkle tree db error: {0}")]
pub struct TreeDbError(pub String);

/// Metadata of one of the world state trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeInfo {
    /// The tree this metadata describes.
    pub tree_id: MerkleTreeId,
    /// The current root of the tree.
    pub root: B256,
    /// The number of leaves in the tree.
    pub size: u64,
    /// The depth of the tree.
    pub depth: u32,
}

/// A merkle membership path for a leaf, bottom up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingPath {
    /// The index of the leaf the path belongs to.
    pub leaf_index: u64,
    /// The sibling hashes from the leaf's level up to the root.
    pub hashes: Vec<B256>,
}

/// The merkle tree database the synchronizer drives.
///
/// [`handle_l2_block`](Self::handle_l2_block) must be atomic per block: a
/// failed call leaves the trees at the state of the previous block, and the
/// synchronizer will present the same block again.
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait MerkleTreeDb {
    /// Returns the metadata of the given tree.
    async fn get_tree_info(&self, tree_id: MerkleTreeId) -> Result<TreeInfo, TreeDbError>;

    /// Returns the sibling path of the given leaf.
    async fn get_sibling_path(
        &self,
        tree_id: MerkleTreeId,
        leaf_index: u64,
    ) -> Result<SiblingPath, TreeDbError>;

    /// Applies all state changes of the given block to the trees.
    async fn handle_l2_block(&self, block: &L2Block) -> Result<(), TreeDbError>;
}
