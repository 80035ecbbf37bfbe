//! Chain data read back by the reporter

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Destination; absent for contract creation
    pub to: Option<String>,
    /// Hex encoded call data
    pub input: String,
    pub gas: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    #[serde(default)]
    pub gas_used: u64,
    pub transactions: Vec<Transaction>,
}
