//! The world state synchronizer keeps a merkle tree database in lockstep
//! with the mirrored L2 chain.
//!
//! Blocks are pulled from an [`L2BlockSource`] by a background downloader,
//! buffered in a bounded queue, and applied to the tree database strictly in
//! order. The number of the last applied block is persisted after every
//! block so a restart resumes where the previous run left off.
//!
//! [`L2BlockSource`]: tessera_types::L2BlockSource

mod config;
pub use config::WorldStateConfig;

mod error;
pub use error::WorldStateError;

mod tree_db;
pub use tree_db::{MerkleTreeDb, SiblingPath, TreeDbError, TreeInfo};

mod pointer;
pub use pointer::{MemorySyncedBlockStore, SyncedBlockStore, SyncedBlockStoreError};

mod downloader;
pub(crate) use downloader::BlockDownloader;

mod synchronizer;
pub use synchronizer::{WorldStateRunningState, WorldStateStatus, WorldStateSynchronizer};

mod metrics;
pub(crate) use metrics::Metrics;
