use alloy_primitives::{Address, B256, Bytes};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// The public addresses of a deployed L2 contract, as carried in a block
/// body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct ContractData {
    /// The address of the contract on L2.
    pub contract_address: B256,
    /// The L1 portal contract paired with it.
    pub portal_address: Address,
}

impl ContractData {
    /// Creates a new [`ContractData`].
    pub const fn new(contract_address: B256, portal_address: Address) -> Self {
        Self { contract_address, portal_address }
    }
}

/// A full contract deployment record emitted alongside a block, including the
/// public key material and bytecode a client needs to interact with the
/// contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDeploymentData {
    /// The L2 block the contract was deployed in.
    pub l2_block_number: u64,
    /// The address of the contract on L2.
    pub contract_address: B256,
    /// The L1 portal contract paired with it.
    pub portal_address: Address,
    /// The partial address commitment of the contract.
    pub partial_address: B256,
    /// X coordinate of the deployer public key.
    pub public_key_x: B256,
    /// Y coordinate of the deployer public key.
    pub public_key_y: B256,
    /// The contract bytecode.
    pub bytecode: Bytes,
}
