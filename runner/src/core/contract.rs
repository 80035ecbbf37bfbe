//! Compiled and deployed contract records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One entry of a contract ABI; only functions matter for decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
}

fn function_kind() -> String {
    "function".to_string()
}

impl AbiEntry {
    pub fn is_function(&self) -> bool {
        self.kind == "function"
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.kind.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }
}

/// Compiler output for one contract class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledContract {
    pub class_name: String,
    pub abi: Vec<AbiEntry>,
    pub bytecode: String,
    /// Function signature to 4-byte selector (hex, no prefix)
    #[serde(default)]
    pub function_hashes: BTreeMap<String, String>,
}

/// A contract instance living on the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedContract {
    pub class_name: String,
    pub deployed_address: String,
    pub abi: Vec<AbiEntry>,
    #[serde(default)]
    pub function_hashes: BTreeMap<String, String>,
    /// Silent contracts never show up in transaction logs
    #[serde(default)]
    pub silent: bool,
}

impl DeployedContract {
    /// Record for a deployment known only by class and address
    pub fn bare(class_name: impl Into<String>, deployed_address: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            deployed_address: deployed_address.into(),
            abi: Vec::new(),
            function_hashes: BTreeMap::new(),
            silent: false,
        }
    }

    pub fn from_compiled(compiled: &CompiledContract, deployed_address: impl Into<String>) -> Self {
        Self {
            class_name: compiled.class_name.clone(),
            deployed_address: deployed_address.into(),
            abi: compiled.abi.clone(),
            function_hashes: compiled.function_hashes.clone(),
            silent: false,
        }
    }

    /// Find the ABI function whose selector starts `input`
    pub fn function_for_selector(&self, selector: &str) -> Option<&AbiEntry> {
        let signature = self
            .function_hashes
            .iter()
            .find(|(_, hash)| hash.eq_ignore_ascii_case(selector))
            .map(|(signature, _)| signature)?;
        self.abi
            .iter()
            .find(|entry| entry.is_function() && entry.signature() == *signature)
    }
}
