use alloy_primitives::{Address, B256};

/// A message sent from L1 into the L2 message tree, as recorded by the inbox
/// contract.
///
/// The `key` uniquely identifies the message and is what later cancellation
/// and consumption events refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1ToL2Message {
    /// The unique entry key of the message in the inbox.
    pub key: B256,
    /// The L1 account that submitted the message.
    pub sender: Address,
    /// The L2 recipient the message is addressed to.
    pub recipient: B256,
    /// The message content hash.
    pub content: B256,
    /// Hash of the secret required to consume the message on L2.
    pub secret_hash: B256,
    /// L1 timestamp after which the sender may cancel the message.
    pub deadline: u64,
    /// Fee offered to the sequencer for including the message.
    pub fee: u64,
    /// The L1 block in which the message was added.
    pub l1_block_number: u64,
}
