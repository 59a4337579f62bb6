//! Lending reserve record

use solana_sdk::pubkey::Pubkey;

use super::reader::{AccountReader, PUBKEY_LEN};
use crate::tx_builder::errors::TransactionBuilderError;

const VERSION_OFFSET: usize = 0;
const LAST_UPDATE_SLOT_OFFSET: usize = 1;
const LENDING_MARKET_OFFSET: usize = 10;
const LIQUIDITY_MINT_OFFSET: usize = 42;
const LIQUIDITY_DECIMALS_OFFSET: usize = 74;
const LIQUIDITY_SUPPLY_OFFSET: usize = 75;
const PYTH_ORACLE_OFFSET: usize = 107;
const SWITCHBOARD_ORACLE_OFFSET: usize = 139;
const AVAILABLE_AMOUNT_OFFSET: usize = 171;
const COLLATERAL_MINT_OFFSET: usize = 227;
const COLLATERAL_SUPPLY_OFFSET: usize = 267;

/// Decoded reserve fields used to build lending instructions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReserve {
    pub version: u8,
    pub last_update_slot: u64,
    pub lending_market: Pubkey,
    pub liquidity_mint: Pubkey,
    pub liquidity_decimals: u8,
    pub liquidity_supply: Pubkey,
    pub pyth_oracle: Pubkey,
    pub switchboard_oracle: Pubkey,
    pub available_amount: u64,
    pub collateral_mint: Pubkey,
    pub collateral_supply: Pubkey,
}

impl ParsedReserve {
    pub const RECORD: &'static str = "reserve";
    /// Ends with the collateral supply key
    pub const MIN_SIZE: usize = COLLATERAL_SUPPLY_OFFSET + PUBKEY_LEN;

    pub fn parse(data: &[u8]) -> Result<Self, TransactionBuilderError> {
        let r = AccountReader::new(Self::RECORD, data, Self::MIN_SIZE)?;
        Ok(Self {
            version: r.u8("version", VERSION_OFFSET)?,
            last_update_slot: r.u64_le("last_update_slot", LAST_UPDATE_SLOT_OFFSET)?,
            lending_market: r.pubkey("lending_market", LENDING_MARKET_OFFSET)?,
            liquidity_mint: r.pubkey("liquidity_mint", LIQUIDITY_MINT_OFFSET)?,
            liquidity_decimals: r.u8("liquidity_decimals", LIQUIDITY_DECIMALS_OFFSET)?,
            liquidity_supply: r.pubkey("liquidity_supply", LIQUIDITY_SUPPLY_OFFSET)?,
            pyth_oracle: r.pubkey("pyth_oracle", PYTH_ORACLE_OFFSET)?,
            switchboard_oracle: r.pubkey("switchboard_oracle", SWITCHBOARD_ORACLE_OFFSET)?,
            available_amount: r.u64_le("available_amount", AVAILABLE_AMOUNT_OFFSET)?,
            collateral_mint: r.pubkey("collateral_mint", COLLATERAL_MINT_OFFSET)?,
            collateral_supply: r.pubkey("collateral_supply", COLLATERAL_SUPPLY_OFFSET)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a reserve buffer with the given keys at their offsets
    pub(crate) fn reserve_bytes(
        market: &Pubkey,
        liquidity_mint: &Pubkey,
        decimals: u8,
        keys: [Pubkey; 5],
    ) -> Vec<u8> {
        let [supply, pyth, switchboard, collateral_mint, collateral_supply] = keys;
        let mut data = vec![0u8; 619];
        data[VERSION_OFFSET] = 1;
        data[LENDING_MARKET_OFFSET..LENDING_MARKET_OFFSET + 32].copy_from_slice(market.as_ref());
        data[LIQUIDITY_MINT_OFFSET..LIQUIDITY_MINT_OFFSET + 32]
            .copy_from_slice(liquidity_mint.as_ref());
        data[LIQUIDITY_DECIMALS_OFFSET] = decimals;
        data[LIQUIDITY_SUPPLY_OFFSET..LIQUIDITY_SUPPLY_OFFSET + 32].copy_from_slice(supply.as_ref());
        data[PYTH_ORACLE_OFFSET..PYTH_ORACLE_OFFSET + 32].copy_from_slice(pyth.as_ref());
        data[SWITCHBOARD_ORACLE_OFFSET..SWITCHBOARD_ORACLE_OFFSET + 32]
            .copy_from_slice(switchboard.as_ref());
        data[COLLATERAL_MINT_OFFSET..COLLATERAL_MINT_OFFSET + 32]
            .copy_from_slice(collateral_mint.as_ref());
        data[COLLATERAL_SUPPLY_OFFSET..COLLATERAL_SUPPLY_OFFSET + 32]
            .copy_from_slice(collateral_supply.as_ref());
        data
    }

    #[test]
    fn test_min_size_constant() {
        assert_eq!(ParsedReserve::MIN_SIZE, 299);
    }

    #[test]
    fn test_one_byte_short_is_rejected() {
        let data = vec![0u8; ParsedReserve::MIN_SIZE - 1];
        assert!(matches!(
            ParsedReserve::parse(&data),
            Err(TransactionBuilderError::MalformedAccount { record: "reserve", .. })
        ));
    }

    #[test]
    fn test_zero_filled_min_size_parses_to_zero_fields() {
        let data = vec![0u8; ParsedReserve::MIN_SIZE];
        let reserve = ParsedReserve::parse(&data).unwrap();
        assert_eq!(reserve.version, 0);
        assert_eq!(reserve.last_update_slot, 0);
        assert_eq!(reserve.liquidity_decimals, 0);
        assert_eq!(reserve.available_amount, 0);
        assert_eq!(reserve.lending_market, Pubkey::default());
        assert_eq!(reserve.collateral_supply, Pubkey::default());
    }

    #[test]
    fn test_parses_keys_at_offsets() {
        let market = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let keys = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let data = reserve_bytes(&market, &mint, 6, keys);
        let reserve = ParsedReserve::parse(&data).unwrap();

        assert_eq!(reserve.version, 1);
        assert_eq!(reserve.lending_market, market);
        assert_eq!(reserve.liquidity_mint, mint);
        assert_eq!(reserve.liquidity_decimals, 6);
        assert_eq!(reserve.liquidity_supply, keys[0]);
        assert_eq!(reserve.pyth_oracle, keys[1]);
        assert_eq!(reserve.switchboard_oracle, keys[2]);
        assert_eq!(reserve.collateral_mint, keys[3]);
        assert_eq!(reserve.collateral_supply, keys[4]);
    }
}
