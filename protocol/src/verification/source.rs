//! # Standard-JSON Source Bundle
//!
//! The explorer recompiles whatever we send and compares the result with the
//! deployed bytecode, so the bundle must reproduce the original compilation:
//! same files, same paths, same optimizer settings.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{OPTIMIZER_ENABLED, OPTIMIZER_RUNS};

/// Source of the ERC-20 interface, as deployed.
pub const IERC20_SOURCE: &str = include_str!("../../solidity/IERC20.sol");

/// Source of the token contract, as deployed.
pub const ERC20_CUSTOM_SOURCE: &str = include_str!("../../solidity/ERC20Custom.sol");

/// Path of the interface inside the bundle.
pub const IERC20_PATH: &str = "contracts/IERC20.sol";

/// Path of the token contract inside the bundle.
pub const ERC20_CUSTOM_PATH: &str = "contracts/ERC20Custom.sol";

/// One source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub content: String,
}

/// Optimizer block of the compiler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u32,
}

/// Compiler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerSettings {
    pub optimizer: OptimizerSettings,
    pub output_selection: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        let mut per_contract = BTreeMap::new();
        per_contract.insert("*".to_string(), vec!["*".to_string()]);
        let mut output_selection = BTreeMap::new();
        output_selection.insert("*".to_string(), per_contract);

        Self {
            optimizer: OptimizerSettings {
                enabled: OPTIMIZER_ENABLED,
                runs: OPTIMIZER_RUNS,
            },
            output_selection,
        }
    }
}

/// A complete solc standard-JSON input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardJsonInput {
    pub language: String,
    pub sources: BTreeMap<String, SourceFile>,
    pub settings: CompilerSettings,
}

impl StandardJsonInput {
    /// The bundle for the factory-deployed token contract.
    ///
    /// The source does not depend on the constructor arguments; those travel
    /// separately as ABI-encoded hex.
    pub fn token_contract() -> Self {
        let mut sources = BTreeMap::new();
        sources.insert(
            IERC20_PATH.to_string(),
            SourceFile {
                content: IERC20_SOURCE.to_string(),
            },
        );
        sources.insert(
            ERC20_CUSTOM_PATH.to_string(),
            SourceFile {
                content: ERC20_CUSTOM_SOURCE.to_string(),
            },
        );

        Self {
            language: "Solidity".to_string(),
            sources,
            settings: CompilerSettings::default(),
        }
    }

    /// Serializes the bundle into the string that goes in `sourceCode`.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
