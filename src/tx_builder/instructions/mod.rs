//! Instruction planning
//!
//! Every supported operation is turned into an ordered list of
//! [`InstructionPlan`]s. A plan is the exact account list and payload the
//! target program expects; account order is part of the program's ABI and is
//! never rearranged after a plan is built.
//!
//! ## Families
//! - [`lending`]: obligation bootstrap, combined deposit and withdraw
//! - [`transfer`]: native transfer, token transfer, trailing memo
//! - [`swap`]: pre-quoted swap instructions from the quote collaborator
//!
//! Compute budget instructions, when configured, always come first.

pub mod lending;
pub mod swap;
pub mod transfer;

use serde::Serialize;
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use std::fmt;

use crate::config::ComputeBudgetConfig;
use crate::tx_builder::errors::TransactionBuilderError;

/// Access an instruction needs on one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ReadOnly,
    Writable,
    ReadOnlySigner,
    WritableSigner,
}

impl Permission {
    pub fn from_flags(is_signer: bool, is_writable: bool) -> Self {
        match (is_signer, is_writable) {
            (false, false) => Permission::ReadOnly,
            (false, true) => Permission::Writable,
            (true, false) => Permission::ReadOnlySigner,
            (true, true) => Permission::WritableSigner,
        }
    }

    pub fn is_signer(&self) -> bool {
        matches!(self, Permission::ReadOnlySigner | Permission::WritableSigner)
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Permission::Writable | Permission::WritableSigner)
    }
}

/// One entry of an instruction's account list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRef {
    pub address: Pubkey,
    pub permission: Permission,
}

impl AccountRef {
    pub fn readonly(address: Pubkey) -> Self {
        Self { address, permission: Permission::ReadOnly }
    }

    pub fn writable(address: Pubkey) -> Self {
        Self { address, permission: Permission::Writable }
    }

    pub fn readonly_signer(address: Pubkey) -> Self {
        Self { address, permission: Permission::ReadOnlySigner }
    }

    pub fn writable_signer(address: Pubkey) -> Self {
        Self { address, permission: Permission::WritableSigner }
    }

    pub fn to_account_meta(&self) -> AccountMeta {
        AccountMeta {
            pubkey: self.address,
            is_signer: self.permission.is_signer(),
            is_writable: self.permission.is_writable(),
        }
    }
}

impl From<&AccountMeta> for AccountRef {
    fn from(meta: &AccountMeta) -> Self {
        Self {
            address: meta.pubkey,
            permission: Permission::from_flags(meta.is_signer, meta.is_writable),
        }
    }
}

/// Program id, ordered accounts and payload for a single instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionPlan {
    /// Short name for logs and metadata
    pub label: &'static str,
    pub program_id: Pubkey,
    pub accounts: Vec<AccountRef>,
    pub data: Vec<u8>,
}

impl InstructionPlan {
    pub fn new(
        label: &'static str,
        program_id: Pubkey,
        accounts: Vec<AccountRef>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            label,
            program_id,
            accounts,
            data,
        }
    }

    /// Wrap an instruction produced by a program's own client crate
    pub fn from_instruction(label: &'static str, ix: Instruction) -> Self {
        Self {
            label,
            program_id: ix.program_id,
            accounts: ix.accounts.iter().map(AccountRef::from).collect(),
            data: ix.data,
        }
    }

    pub fn to_instruction(&self) -> Instruction {
        Instruction::new_with_bytes(
            self.program_id,
            &self.data,
            self.accounts.iter().map(AccountRef::to_account_meta).collect(),
        )
    }
}

/// Operation variants the encoder knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Deposit,
    Withdraw,
    Transfer,
    Swap,
}

impl Operation {
    /// Resolve an operation name; anything else is unsupported
    pub fn parse(name: &str) -> Result<Self, TransactionBuilderError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "deposit" => Ok(Operation::Deposit),
            "withdraw" => Ok(Operation::Withdraw),
            "transfer" => Ok(Operation::Transfer),
            "swap" => Ok(Operation::Swap),
            _ => Err(TransactionBuilderError::UnsupportedOperation(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
            Operation::Transfer => "transfer",
            Operation::Swap => "swap",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute budget instructions requested by configuration
///
/// The unit limit comes before the unit price; either may be omitted.
pub fn plan_compute_budget(config: &ComputeBudgetConfig) -> Vec<InstructionPlan> {
    let mut plans = Vec::with_capacity(2);
    if let Some(limit) = config.unit_limit.filter(|l| *l > 0) {
        plans.push(InstructionPlan::from_instruction(
            "compute_unit_limit",
            ComputeBudgetInstruction::set_compute_unit_limit(limit),
        ));
    }
    if let Some(price) = config.unit_price_micro_lamports.filter(|p| *p > 0) {
        plans.push(InstructionPlan::from_instruction(
            "compute_unit_price",
            ComputeBudgetInstruction::set_compute_unit_price(price),
        ));
    }
    plans
}
