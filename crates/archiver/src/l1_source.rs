use alloy_primitives::{B256, Bytes};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};
use async_trait::async_trait;
use tessera_types::{ContractDeploymentData, L1ToL2Message};
use thiserror::Error;

/// The event kinds the archiver subscribes to, one per watched log signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum L1EventKind {
    /// A message was added to the inbox pending set.
    MessageAdded,
    /// A pending message was cancelled by its sender.
    MessageCancelled,
    /// The rollup contract accepted a proven L2 block.
    L2BlockProcessed,
    /// A contract deployment was announced for an L2 block.
    ContractDeployment,
}

/// A single decoded log emitted by one of the watched L1 contracts.
///
/// Raw log decoding happens at the [`L1Source`] boundary, so everything past
/// it works with typed events only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1Event {
    /// The L1 block that contained the log.
    pub l1_block_number: u64,
    /// The log index within that block.
    pub log_index: u64,
    /// The decoded payload.
    pub data: L1EventData,
}

impl L1Event {
    /// The kind of the event.
    pub const fn kind(&self) -> L1EventKind {
        match self.data {
            L1EventData::MessageAdded(_) => L1EventKind::MessageAdded,
            L1EventData::MessageCancelled { .. } => L1EventKind::MessageCancelled,
            L1EventData::L2BlockProcessed { .. } => L1EventKind::L2BlockProcessed,
            L1EventData::ContractDeployment(_) => L1EventKind::ContractDeployment,
        }
    }
}

/// The decoded payload of an [`L1Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum L1EventData {
    /// A message entered the inbox pending set.
    MessageAdded(L1ToL2Message),
    /// A pending message was cancelled.
    MessageCancelled {
        /// The entry key of the cancelled message.
        key: B256,
    },
    /// A proven L2 block was accepted by the rollup contract.
    L2BlockProcessed {
        /// The number of the accepted L2 block.
        l2_block_number: u64,
        /// The L1 transaction that carried the block.
        tx_hash: B256,
    },
    /// A contract deployment record was announced.
    ContractDeployment(ContractDeploymentData),
}

/// An L1 transaction fetched by hash, reduced to what the archiver needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1Transaction {
    /// The transaction hash.
    pub hash: B256,
    /// The full calldata of the transaction.
    pub calldata: Bytes,
}

/// The 4-byte selector of the rollup contract's block submission function.
pub const PROCESS_ROLLUP_SELECTOR: [u8; 4] = [0x8f, 0x28, 0x79, 0x7e];

/// Failure to parse rollup transaction calldata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RollupCalldataError {
    /// The calldata is shorter than a function selector.
    #[error("calldata too short for a function selector")]
    MissingSelector,
    /// The calldata targets a different function.
    #[error("unexpected function selector: {0:#010x}")]
    UnknownSelector(u32),
    /// The argument payload failed to decode.
    #[error("invalid calldata payload: {0}")]
    Rlp(#[from] alloy_rlp::Error),
}

/// The decoded calldata of a rollup block submission: the proof and the
/// encoded block body.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct RollupCalldata {
    /// The rollup proof. Opaque to the archiver.
    pub proof: Bytes,
    /// The RLP-encoded L2 block body.
    pub body: Bytes,
}

impl RollupCalldata {
    /// Creates a new [`RollupCalldata`].
    pub const fn new(proof: Bytes, body: Bytes) -> Self {
        Self { proof, body }
    }

    /// Encodes the calldata as it appears on an L1 transaction: the function
    /// selector followed by the RLP-encoded arguments.
    pub fn to_calldata(&self) -> Bytes {
        let mut out = Vec::with_capacity(4 + self.length());
        out.extend_from_slice(&PROCESS_ROLLUP_SELECTOR);
        self.encode(&mut out);
        out.into()
    }

    /// Parses the calldata of a rollup block submission transaction.
    pub fn from_calldata(calldata: &[u8]) -> Result<Self, RollupCalldataError> {
        let (selector, payload) = calldata
            .split_first_chunk::<4>()
            .ok_or(RollupCalldataError::MissingSelector)?;
        if *selector != PROCESS_ROLLUP_SELECTOR {
            return Err(RollupCalldataError::UnknownSelector(u32::from_be_bytes(*selector)));
        }
        Ok(Self::decode(&mut &payload[..])?)
    }
}

/// Errors that may occur while querying L1.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum L1SourceError {
    /// The underlying transport failed.
    #[error("l1 transport error: {0}")]
    Transport(String),
    /// A referenced transaction could not be found.
    #[error("transaction not found: {0}")]
    TransactionNotFound(B256),
}

/// Read access to the L1 chain, already filtered and decoded for the watched
/// rollup contracts.
///
/// Implementations wrap an L1 RPC client configured with the contract
/// addresses from [`ArchiverConfig`](crate::ArchiverConfig).
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait L1Source {
    /// Returns the current L1 chain tip number.
    async fn current_block_number(&self) -> Result<u64, L1SourceError>;

    /// Returns the decoded events of the given kind emitted in L1 blocks
    /// `from..=to`, ordered by block number and log index.
    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        kind: L1EventKind,
    ) -> Result<Vec<L1Event>, L1SourceError>;

    /// Fetches an L1 transaction by hash.
    async fn get_transaction(&self, hash: B256) -> Result<L1Transaction, L1SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calldata_round_trips() {
        let calldata = RollupCalldata::new(
            Bytes::from_static(b"proof bytes"),
            Bytes::from_static(b"encoded body"),
        );
        let raw = calldata.to_calldata();
        assert_eq!(&raw[..4], &PROCESS_ROLLUP_SELECTOR);
        assert_eq!(RollupCalldata::from_calldata(&raw).unwrap(), calldata);
    }

    #[test]
    fn rejects_short_and_foreign_calldata() {
        assert_eq!(
            RollupCalldata::from_calldata(&[0x01, 0x02]),
            Err(RollupCalldataError::MissingSelector)
        );
        let mut raw = RollupCalldata::default().to_calldata().to_vec();
        raw[0] ^= 0xff;
        assert!(matches!(
            RollupCalldata::from_calldata(&raw),
            Err(RollupCalldataError::UnknownSelector(_))
        ));
    }

    #[test]
    fn rejects_garbage_payload() {
        let mut raw = PROCESS_ROLLUP_SELECTOR.to_vec();
        raw.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(
            RollupCalldata::from_calldata(&raw),
            Err(RollupCalldataError::Rlp(_))
        ));
    }
}
