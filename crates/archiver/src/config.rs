use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The L1 addresses of the rollup contracts the archiver watches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1ContractAddresses {
    /// The rollup contract, which emits block commitments.
    pub rollup: Address,
    /// The inbox contract, which emits message additions and cancellations.
    pub inbox: Address,
    /// The registry contract.
    pub registry: Address,
    /// The emitter of contract deployment events.
    pub contract_deployment_emitter: Address,
}

/// Configuration for the [`Archiver`](crate::Archiver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiverConfig {
    /// How often the background task polls L1 for new blocks.
    pub poll_interval: Duration,
    /// The L1 contracts to watch.
    pub l1_contracts: L1ContractAddresses,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            l1_contracts: L1ContractAddresses::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_contract_addresses_from_json() {
        let config: ArchiverConfig = serde_json::from_str(
            r#"{
                "poll_interval": { "secs": 5, "nanos": 0 },
                "l1_contracts": {
                    "rollup": "0x0101010101010101010101010101010101010101",
                    "inbox": "0x0202020202020202020202020202020202020202",
                    "registry": "0x0303030303030303030303030303030303030303",
                    "contract_deployment_emitter": "0x0404040404040404040404040404040404040404"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.l1_contracts, L1ContractAddresses {
            rollup: Address::repeat_byte(0x01),
            inbox: Address::repeat_byte(0x02),
            registry: Address::repeat_byte(0x03),
            contract_deployment_emitter: Address::repeat_byte(0x04),
        });
    }
}
