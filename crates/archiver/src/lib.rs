//! The archiver follows the L1 contracts of the rollup and mirrors what they
//! emit into local stores: pending L1-to-L2 messages, proven L2 blocks
//! reconstructed from rollup transaction calldata, and contract deployment
//! records.
//!
//! It exposes the mirrored chain through [`L2BlockSource`] so other
//! components can follow it without touching L1 themselves.
//!
//! [`L2BlockSource`]: tessera_types::L2BlockSource

mod config;
pub use config::{ArchiverConfig, L1ContractAddresses};

mod error;
pub use error::ArchiverError;

mod l1_source;
pub use l1_source::{
    L1Event, L1EventData, L1EventKind, L1Source, L1SourceError, L1Transaction, RollupCalldata,
    RollupCalldataError,
};

mod store;
pub use store::{
    ArchiverStore, BlockStoreReader, BlockStoreWriter, MemoryArchiverStore, MessageStoreReader,
    MessageStoreWriter, StoreError,
};

mod archiver;
pub use archiver::Archiver;

mod metrics;
pub(crate) use metrics::Metrics;
