//! Builder configuration
//!
//! Passed in explicitly by the host. The core never reads environment
//! variables or files; `from_file` exists for the host binary only.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::address::parse_address;
use crate::tx_builder::errors::TransactionBuilderError;

/// Packet data ceiling for a serialized transaction
pub const MAX_TRANSACTION_SIZE: usize = 1232;
/// Instruction ceiling per transaction
pub const MAX_INSTRUCTIONS: usize = 64;

/// Main builder configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Transaction limits and advisory thresholds
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Lending program and market
    #[serde(default)]
    pub lending: LendingConfig,

    /// Swap program allow-list
    #[serde(default)]
    pub swap: SwapConfig,

    /// Optional compute budget instructions
    #[serde(default)]
    pub compute_budget: ComputeBudgetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Hard ceiling for the serialized transaction, in bytes
    #[serde(default = "default_max_transaction_size")]
    pub max_transaction_size: usize,

    /// Fraction of the size ceiling above which an advisory is emitted
    #[serde(default = "default_size_warning_ratio")]
    pub size_warning_ratio: f64,

    /// Hard ceiling on instructions per transaction
    #[serde(default = "default_max_instructions")]
    pub max_instructions: usize,

    /// Instruction count above which an advisory is emitted
    #[serde(default = "default_instruction_warning_threshold")]
    pub instruction_warning_threshold: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingConfig {
    /// Lending program id (Base58)
    #[serde(default = "default_lending_program")]
    pub program_id: String,

    /// Default lending market (Base58)
    #[serde(default = "default_lending_market")]
    pub market: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Programs a pre-quoted swap instruction may target (Base58)
    #[serde(default = "default_swap_programs")]
    pub allowed_programs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputeBudgetConfig {
    /// Compute unit limit (omitted when unset)
    #[serde(default)]
    pub unit_limit: Option<u32>,

    /// Priority fee in micro-lamports per compute unit (omitted when unset)
    #[serde(default)]
    pub unit_price_micro_lamports: Option<u64>,
}

// Default value functions
fn default_max_transaction_size() -> usize { MAX_TRANSACTION_SIZE }
fn default_size_warning_ratio() -> f64 { 0.9 }
fn default_max_instructions() -> usize { MAX_INSTRUCTIONS }
fn default_instruction_warning_threshold() -> usize { 10 }
fn default_lending_program() -> String { "So1endDq2YkqhipRh3WViPa8hdiSpxWy6z3Z6tMCpAo".to_string() }
fn default_lending_market() -> String { "4UpD2fh7xH3VP9QQaXtsS1YY3bxzWhtfpks7FatyKvdY".to_string() }
fn default_swap_programs() -> Vec<String> { vec!["JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4".to_string()] }

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_transaction_size: default_max_transaction_size(),
            size_warning_ratio: default_size_warning_ratio(),
            max_instructions: default_max_instructions(),
            instruction_warning_threshold: default_instruction_warning_threshold(),
        }
    }
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            program_id: default_lending_program(),
            market: default_lending_market(),
        }
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            allowed_programs: default_swap_programs(),
        }
    }
}

impl LimitsConfig {
    /// Size above which an advisory is emitted
    pub fn size_warning_threshold(&self) -> usize {
        (self.max_transaction_size as f64 * self.size_warning_ratio) as usize
    }
}

impl BuilderConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: BuilderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject inconsistent limits and unparsable program ids
    pub fn validate(&self) -> Result<(), TransactionBuilderError> {
        let limits = &self.limits;
        if limits.max_transaction_size == 0 || limits.max_transaction_size > MAX_TRANSACTION_SIZE {
            return Err(TransactionBuilderError::Configuration(format!(
                "max_transaction_size must be in 1..={}, got {}",
                MAX_TRANSACTION_SIZE, limits.max_transaction_size
            )));
        }
        if !(limits.size_warning_ratio > 0.0 && limits.size_warning_ratio <= 1.0) {
            return Err(TransactionBuilderError::Configuration(format!(
                "size_warning_ratio must be in (0, 1], got {}",
                limits.size_warning_ratio
            )));
        }
        if limits.max_instructions == 0 || limits.max_instructions > MAX_INSTRUCTIONS {
            return Err(TransactionBuilderError::Configuration(format!(
                "max_instructions must be in 1..={}, got {}",
                MAX_INSTRUCTIONS, limits.max_instructions
            )));
        }
        if limits.instruction_warning_threshold > limits.max_instructions {
            return Err(TransactionBuilderError::Configuration(format!(
                "instruction_warning_threshold {} exceeds max_instructions {}",
                limits.instruction_warning_threshold, limits.max_instructions
            )));
        }
        self.lending_program_id()?;
        self.lending_market()?;
        self.allowed_swap_programs()?;
        Ok(())
    }

    pub fn lending_program_id(&self) -> Result<Pubkey, TransactionBuilderError> {
        parse_config_address("lending.program_id", &self.lending.program_id)
    }

    pub fn lending_market(&self) -> Result<Pubkey, TransactionBuilderError> {
        parse_config_address("lending.market", &self.lending.market)
    }

    pub fn allowed_swap_programs(&self) -> Result<Vec<Pubkey>, TransactionBuilderError> {
        self.swap
            .allowed_programs
            .iter()
            .map(|p| parse_config_address("swap.allowed_programs", p))
            .collect()
    }
}

fn parse_config_address(name: &str, value: &str) -> Result<Pubkey, TransactionBuilderError> {
    parse_address(value)
        .map_err(|e| TransactionBuilderError::Configuration(format!("{}: {}", name, e)))
}
