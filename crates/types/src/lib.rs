//! Core types shared across the tessera sync components.
//!
//! This crate defines the domain model exchanged between the archiver and the
//! world state synchronizer: L2 blocks and their calldata body codec, log
//! bundles, cross-chain messages, contract deployment records, and the
//! append-only merkle tree snapshots carried by every block.

mod tree;
pub use tree::{AppendOnlyTreeSnapshot, MerkleTreeId};

mod message;
pub use message::L1ToL2Message;

mod contract;
pub use contract::{ContractData, ContractDeploymentData};

mod logs;
pub use logs::{BlockLogs, LogKind, TxLogs};

mod block;
pub use block::{BlockDecodeError, L2Block, PublicDataWrite};

mod source;
pub use source::{L2BlockSource, L2BlockSourceError};
