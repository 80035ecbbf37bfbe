//! Chain telemetry carried on the event bus

use serde::{Deserialize, Serialize};

/// New block announcement with the gas it consumed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub gas_used: u64,
}

/// Receipt of a single contract deployment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContractReceipt {
    pub class_name: String,
    pub address: String,
    pub gas_used: u64,
}
