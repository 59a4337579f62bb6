//! Lending market record

use solana_sdk::pubkey::Pubkey;

use super::reader::{AccountReader, PUBKEY_LEN};
use crate::tx_builder::errors::TransactionBuilderError;

const VERSION_OFFSET: usize = 0;
const BUMP_SEED_OFFSET: usize = 1;
const OWNER_OFFSET: usize = 2;
const QUOTE_CURRENCY_OFFSET: usize = 34;
const TOKEN_PROGRAM_OFFSET: usize = 66;
const ORACLE_PROGRAM_OFFSET: usize = 98;
const SWITCHBOARD_PROGRAM_OFFSET: usize = 130;

/// Decoded lending market fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMarket {
    pub version: u8,
    /// Bump for the market authority program address
    pub bump_seed: u8,
    pub owner: Pubkey,
    pub quote_currency: [u8; 32],
    pub token_program_id: Pubkey,
    pub oracle_program_id: Pubkey,
    pub switchboard_program_id: Pubkey,
}

impl ParsedMarket {
    pub const RECORD: &'static str = "lending_market";
    pub const MIN_SIZE: usize = SWITCHBOARD_PROGRAM_OFFSET + PUBKEY_LEN;

    pub fn parse(data: &[u8]) -> Result<Self, TransactionBuilderError> {
        let r = AccountReader::new(Self::RECORD, data, Self::MIN_SIZE)?;

        let mut quote_currency = [0u8; 32];
        quote_currency.copy_from_slice(r.bytes("quote_currency", QUOTE_CURRENCY_OFFSET, 32)?);

        Ok(Self {
            version: r.u8("version", VERSION_OFFSET)?,
            bump_seed: r.u8("bump_seed", BUMP_SEED_OFFSET)?,
            owner: r.pubkey("owner", OWNER_OFFSET)?,
            quote_currency,
            token_program_id: r.pubkey("token_program_id", TOKEN_PROGRAM_OFFSET)?,
            oracle_program_id: r.pubkey("oracle_program_id", ORACLE_PROGRAM_OFFSET)?,
            switchboard_program_id: r.pubkey("switchboard_program_id", SWITCHBOARD_PROGRAM_OFFSET)?,
        })
    }
}
