use crate::{L1SourceError, RollupCalldataError, StoreError};
use tessera_types::BlockDecodeError;
use thiserror::Error;

/// Errors that may occur while syncing the archiver against L1.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArchiverError {
    /// An L1 query failed.
    #[error(transparent)]
    Source(#[from] L1SourceError),

    /// A local store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The calldata of a rollup transaction could not be parsed.
    #[error("invalid rollup calldata for block {l2_block_number}: {source}")]
    InvalidCalldata {
        /// The L2 block the transaction committed.
        l2_block_number: u64,
        /// The underlying parse failure.
        source: RollupCalldataError,
    },

    /// A block body extracted from rollup calldata failed to decode.
    #[error("failed to decode body of block {l2_block_number}: {source}")]
    Decode {
        /// The L2 block the body belongs to.
        l2_block_number: u64,
        /// The underlying decode failure.
        source: BlockDecodeError,
    },

    /// A decoded block does not extend the stored chain.
    #[error("block {got} does not extend the stored chain, expected block {expected}")]
    NonContiguousBlock {
        /// The block number that would extend the chain.
        expected: u64,
        /// The block number that was decoded.
        got: u64,
    },
}
