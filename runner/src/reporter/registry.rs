//! Deployed contracts known to the reporter
//!
//! One record per class; a re-deployment replaces the earlier record. The
//! lower-cased address index is rebuilt on every change.

use std::collections::HashMap;

use crate::core::DeployedContract;

#[derive(Debug, Default)]
pub struct ContractRegistry {
    contracts: Vec<DeployedContract>,
    by_address: HashMap<String, usize>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a deployment or replace the one of the same class
    pub fn upsert(&mut self, contract: DeployedContract) {
        match self.contracts.iter().position(|c| c.class_name == contract.class_name) {
            Some(index) => self.contracts[index] = contract,
            None => self.contracts.push(contract),
        }
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.by_address.clear();
        for (index, contract) in self.contracts.iter().enumerate() {
            if contract.deployed_address.is_empty() {
                continue;
            }
            let slot = self
                .by_address
                .entry(contract.deployed_address.to_lowercase())
                .or_insert(index);
            // A live contract takes the address over from a silent one
            if self.contracts[*slot].silent && !contract.silent {
                *slot = index;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn get(&self, class_name: &str) -> Option<&DeployedContract> {
        self.contracts.iter().find(|c| c.class_name == class_name)
    }

    pub fn by_address(&self, address: &str) -> Option<&DeployedContract> {
        self.by_address
            .get(&address.to_lowercase())
            .and_then(|&index| self.contracts.get(index))
    }

    /// Non-silent contract a transaction to `to` is attributed to
    pub fn match_transaction(&self, to: &str) -> Option<&DeployedContract> {
        self.by_address(to).filter(|c| !c.silent)
    }
}
