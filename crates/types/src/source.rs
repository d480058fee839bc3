use crate::L2Block;
use async_trait::async_trait;

/// Failure of an [`L2BlockSource`] query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum L2BlockSourceError {
    /// The source could not serve the query.
    #[error("block source unavailable: {0}")]
    Unavailable(String),
}

/// A provider of the canonical L2 chain, queried by components that follow
/// it.
///
/// Implemented by the archiver and consumed by the world state synchronizer.
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait L2BlockSource {
    /// Returns the number of the latest L2 block the source has proven, or 0
    /// if none.
    async fn get_block_number(&self) -> Result<u64, L2BlockSourceError>;

    /// Returns up to `limit` consecutive blocks starting at `from`. Returns
    /// fewer when the chain tip is reached, and an empty vector when `from`
    /// is past the tip.
    async fn get_l2_blocks(&self, from: u64, limit: usize)
    -> Result<Vec<L2Block>, L2BlockSourceError>;
}
