//! Prepared context for transaction building
//!
//! The context-preparation phase (network side) fetches a recent blockhash
//! and raw account data and ships them to the builder as plain data. This
//! module holds both shapes of that bundle:
//!
//! - [`PreparedContextDto`]: the serde form, Base58 addresses and Base64
//!   account data, exactly as received
//! - [`PreparedContext`]: the typed form, produced by `TryFrom` after every
//!   address is parsed and every account buffer has gone through the layout
//!   parser
//!
//! The context is untrusted. Conversion validates shape; the instruction
//! encoders re-derive addresses and cross-check records before use.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde::Deserialize;
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    hash::Hash,
    instruction::AccountMeta,
    pubkey::Pubkey,
};
use std::str::FromStr;

use crate::address::parse_address;
use crate::layout::{require_data, ParsePolicy, ParsedMarket, ParsedObligation, ParsedReserve};
use crate::tx_builder::errors::TransactionBuilderError;

/// Blockhash-based validity window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Typed, validated context for one operation request
#[derive(Debug, Clone)]
pub struct PreparedContext {
    /// Fee payer, signer and owner of every user account
    pub owner: Pubkey,
    pub lifetime: Lifetime,
    pub lending: Option<LendingContext>,
    pub transfer: Option<TransferContext>,
    pub swap: Option<SwapContext>,
}

/// Lending accounts and records for a deposit or withdraw
#[derive(Debug, Clone)]
pub struct LendingContext {
    pub market_address: Pubkey,
    pub market: ParsedMarket,
    pub reserve_address: Pubkey,
    pub reserve: ParsedReserve,
    pub obligation_address: Pubkey,
    /// `None` when the obligation account does not exist yet
    pub obligation: Option<ParsedObligation>,
    pub user_liquidity_account: Pubkey,
    pub user_collateral_account: Pubkey,
    pub user_collateral_account_exists: bool,
}

/// Token accounts for a token transfer
#[derive(Debug, Clone, Default)]
pub struct TransferContext {
    pub source_token_account: Option<Pubkey>,
    pub destination_token_account: Option<Pubkey>,
    pub destination_account_exists: bool,
}

/// A pre-quoted swap as returned by the quote collaborator
#[derive(Debug, Clone)]
pub struct SwapContext {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub in_amount: u64,
    pub out_amount: u64,
    pub instructions: Vec<ExternalInstruction>,
    pub lookup_tables: Vec<AddressLookupTableAccount>,
}

/// An instruction supplied verbatim by an external collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

// ----------------------------------------------------------------------------
// Plain-data form
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedContextDto {
    pub owner: String,
    pub blockhash: String,
    pub last_valid_block_height: u64,
    #[serde(default)]
    pub lending: Option<LendingContextDto>,
    #[serde(default)]
    pub transfer: Option<TransferContextDto>,
    #[serde(default)]
    pub swap: Option<SwapContextDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingContextDto {
    pub market_address: String,
    #[serde(default)]
    pub market_data: Option<String>,
    pub reserve_address: String,
    #[serde(default)]
    pub reserve_data: Option<String>,
    pub obligation_address: String,
    #[serde(default)]
    pub obligation_exists: bool,
    #[serde(default)]
    pub obligation_data: Option<String>,
    pub user_liquidity_account: String,
    pub user_collateral_account: String,
    #[serde(default)]
    pub user_collateral_account_exists: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferContextDto {
    #[serde(default)]
    pub source_token_account: Option<String>,
    #[serde(default)]
    pub destination_token_account: Option<String>,
    #[serde(default)]
    pub destination_account_exists: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapContextDto {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
    pub instructions: Vec<ExternalInstructionDto>,
    #[serde(default)]
    pub lookup_tables: Vec<LookupTableDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalInstructionDto {
    pub program_id: String,
    pub accounts: Vec<AccountMetaDto>,
    /// Base64 payload
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMetaDto {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupTableDto {
    pub key: String,
    pub addresses: Vec<String>,
}

fn address_field(field: &'static str, value: &str) -> Result<Pubkey, TransactionBuilderError> {
    parse_address(value).map_err(|e| TransactionBuilderError::invalid_context(field, e.to_string()))
}

fn base64_field(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<Vec<u8>>, TransactionBuilderError> {
    value
        .map(|text| {
            BASE64_STANDARD
                .decode(text)
                .map_err(|e| TransactionBuilderError::invalid_context(field, format!("base64: {}", e)))
        })
        .transpose()
}

fn u64_field(field: &'static str, value: &str) -> Result<u64, TransactionBuilderError> {
    value
        .trim()
        .parse()
        .map_err(|e| TransactionBuilderError::invalid_context(field, format!("{}: '{}'", e, value)))
}

impl TryFrom<PreparedContextDto> for PreparedContext {
    type Error = TransactionBuilderError;

    fn try_from(dto: PreparedContextDto) -> Result<Self, Self::Error> {
        let blockhash = Hash::from_str(dto.blockhash.trim()).map_err(|e| {
            TransactionBuilderError::invalid_context("blockhash", format!("{}: '{}'", e, dto.blockhash))
        })?;

        Ok(Self {
            owner: address_field("owner", &dto.owner)?,
            lifetime: Lifetime {
                blockhash,
                last_valid_block_height: dto.last_valid_block_height,
            },
            lending: dto.lending.map(LendingContext::try_from).transpose()?,
            transfer: dto.transfer.map(TransferContext::try_from).transpose()?,
            swap: dto.swap.map(SwapContext::try_from).transpose()?,
        })
    }
}

impl TryFrom<LendingContextDto> for LendingContext {
    type Error = TransactionBuilderError;

    fn try_from(dto: LendingContextDto) -> Result<Self, Self::Error> {
        let market_data = base64_field("marketData", dto.market_data.as_deref())?;
        let reserve_data = base64_field("reserveData", dto.reserve_data.as_deref())?;
        let obligation_data = base64_field("obligationData", dto.obligation_data.as_deref())?;

        let market = ParsedMarket::parse(require_data(ParsedMarket::RECORD, market_data.as_deref())?)?;
        let reserve =
            ParsedReserve::parse(require_data(ParsedReserve::RECORD, reserve_data.as_deref())?)?;
        let obligation = if dto.obligation_exists {
            Some(ParsedObligation::parse_with_policy(
                require_data(ParsedObligation::RECORD, obligation_data.as_deref())?,
                ParsePolicy::Strict,
            )?)
        } else {
            None
        };

        Ok(Self {
            market_address: address_field("marketAddress", &dto.market_address)?,
            market,
            reserve_address: address_field("reserveAddress", &dto.reserve_address)?,
            reserve,
            obligation_address: address_field("obligationAddress", &dto.obligation_address)?,
            obligation,
            user_liquidity_account: address_field(
                "userLiquidityAccount",
                &dto.user_liquidity_account,
            )?,
            user_collateral_account: address_field(
                "userCollateralAccount",
                &dto.user_collateral_account,
            )?,
            user_collateral_account_exists: dto.user_collateral_account_exists,
        })
    }
}

impl TryFrom<TransferContextDto> for TransferContext {
    type Error = TransactionBuilderError;

    fn try_from(dto: TransferContextDto) -> Result<Self, Self::Error> {
        Ok(Self {
            source_token_account: dto
                .source_token_account
                .as_deref()
                .map(|v| address_field("sourceTokenAccount", v))
                .transpose()?,
            destination_token_account: dto
                .destination_token_account
                .as_deref()
                .map(|v| address_field("destinationTokenAccount", v))
                .transpose()?,
            destination_account_exists: dto.destination_account_exists,
        })
    }
}

impl TryFrom<SwapContextDto> for SwapContext {
    type Error = TransactionBuilderError;

    fn try_from(dto: SwapContextDto) -> Result<Self, Self::Error> {
        let instructions = dto
            .instructions
            .into_iter()
            .map(|ix| {
                let accounts = ix
                    .accounts
                    .iter()
                    .map(|meta| {
                        let pubkey = address_field("instructions.accounts", &meta.pubkey)?;
                        Ok(AccountMeta {
                            pubkey,
                            is_signer: meta.is_signer,
                            is_writable: meta.is_writable,
                        })
                    })
                    .collect::<Result<Vec<_>, TransactionBuilderError>>()?;
                Ok(ExternalInstruction {
                    program_id: address_field("instructions.programId", &ix.program_id)?,
                    accounts,
                    data: base64_field("instructions.data", Some(&ix.data))?.unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, TransactionBuilderError>>()?;

        let lookup_tables = dto
            .lookup_tables
            .iter()
            .map(|table| {
                Ok(AddressLookupTableAccount {
                    key: address_field("lookupTables.key", &table.key)?,
                    addresses: table
                        .addresses
                        .iter()
                        .map(|a| address_field("lookupTables.addresses", a))
                        .collect::<Result<Vec<_>, _>>()?,
                })
            })
            .collect::<Result<Vec<_>, TransactionBuilderError>>()?;

        Ok(Self {
            input_mint: address_field("inputMint", &dto.input_mint)?,
            output_mint: address_field("outputMint", &dto.output_mint)?,
            in_amount: u64_field("inAmount", &dto.in_amount)?,
            out_amount: u64_field("outAmount", &dto.out_amount)?,
            instructions,
            lookup_tables,
        })
    }
}
