//! Transaction build output
//!
//! Everything the host gets back from one build: the unsigned wire
//! transaction, metadata describing what was encoded, and advisories raised
//! while validating limits.
//!
//! ## Key Features
//! - Base64 wire text plus its exact byte size
//! - Required signers taken from the compiled message header
//! - Human and raw amounts side by side for review before signing
//! - Serializes to camelCase JSON for the host

use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};

use crate::tx_builder::instructions::{InstructionPlan, Operation};

/// Non-fatal finding raised while validating limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    /// Serialized size is above the warning fraction of the ceiling
    SizeNearLimit,
    /// Instruction count is above the advisory threshold
    ManyInstructions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
}

impl Advisory {
    pub fn new(kind: AdvisoryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Message format chosen by the assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageVersion {
    Legacy,
    V0,
}

/// Serialized unsigned transaction
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTransaction {
    /// Base64 of the bincode-serialized transaction
    pub base64: String,
    /// Byte length of the serialized form
    pub size: usize,
    pub version: MessageVersion,
    /// Keys whose signatures are still zeroed, in signature order
    pub required_signers: Vec<String>,
    pub instruction_count: usize,
    #[serde(skip)]
    pub transaction: VersionedTransaction,
}

/// A derived or supplied account the operation touches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedAccount {
    pub role: &'static str,
    pub address: String,
}

impl DerivedAccount {
    pub fn new(role: &'static str, address: &Pubkey) -> Self {
        Self {
            role,
            address: address.to_string(),
        }
    }
}

/// What the transaction does, for review before signing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    pub operation: Operation,
    /// Token symbol; `SOL` for native transfers
    pub token: String,
    pub mint: String,
    pub decimals: u8,
    /// Decimal text in whole units
    pub amount: String,
    /// Smallest units, as text so JSON readers keep full precision
    pub raw_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_token: Option<String>,
    pub accounts: Vec<DerivedAccount>,
    /// Instruction labels in transaction order
    pub instructions: Vec<&'static str>,
}

impl OperationMetadata {
    pub fn with_instructions(mut self, plans: &[InstructionPlan]) -> Self {
        self.instructions = plans.iter().map(|p| p.label).collect();
        self
    }
}

/// Result of a successful build
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub transaction: WireTransaction,
    pub metadata: OperationMetadata,
    pub advisories: Vec<Advisory>,
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

impl BuildOutput {
    pub fn has_advisories(&self) -> bool {
        !self.advisories.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
