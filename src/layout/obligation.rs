//! Lending obligation record
//!
//! The deposit list is a u16 little-endian count followed by fixed-size
//! entries. How a bad count is handled depends on the [`ParsePolicy`].
//! [`ParsedObligation::parse`] is lenient and degrades to an empty list for
//! read-only inspection. Transaction builds parse with
//! [`ParsePolicy::Strict`], since a withdraw must list every deposit reserve.
//! The rest of the record is always strict.

use solana_sdk::pubkey::Pubkey;
use tracing::warn;

use super::reader::AccountReader;
use crate::tx_builder::errors::TransactionBuilderError;

const VERSION_OFFSET: usize = 0;
const LAST_UPDATE_SLOT_OFFSET: usize = 1;
const LENDING_MARKET_OFFSET: usize = 10;
const OWNER_OFFSET: usize = 42;
const DEPOSITED_VALUE_OFFSET: usize = 74;
const BORROWED_VALUE_OFFSET: usize = 90;
const ALLOWED_BORROW_VALUE_OFFSET: usize = 106;
const UNHEALTHY_BORROW_VALUE_OFFSET: usize = 122;
const DEPOSITS_LEN_OFFSET: usize = 138;
const DEPOSITS_OFFSET: usize = 140;

// Entry: reserve (32) + deposited amount (8) + market value (16) + reserved (32)
const DEPOSIT_RESERVE_REL: usize = 0;
const DEPOSITED_AMOUNT_REL: usize = 32;
const MARKET_VALUE_REL: usize = 40;

/// Size of one deposit entry
pub const OBLIGATION_DEPOSIT_LEN: usize = 88;
/// Hard ceiling on the declared deposit count
pub const MAX_OBLIGATION_DEPOSITS: usize = 10;
/// Allocated size of an obligation account
pub const OBLIGATION_ACCOUNT_LEN: usize = 1300;

/// How the repeated deposit entries react to a bad declared count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Raise on a count above the ceiling or a buffer too small for it
    Strict,
    /// Yield zero entries instead of raising
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObligationDeposit {
    pub deposit_reserve: Pubkey,
    pub deposited_amount: u64,
    pub market_value: u128,
}

/// Decoded obligation fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedObligation {
    pub version: u8,
    pub last_update_slot: u64,
    pub lending_market: Pubkey,
    pub owner: Pubkey,
    pub deposited_value: u128,
    pub borrowed_value: u128,
    pub allowed_borrow_value: u128,
    pub unhealthy_borrow_value: u128,
    pub deposits: Vec<ObligationDeposit>,
}

impl ParsedObligation {
    pub const RECORD: &'static str = "obligation";
    /// Header through the deposit count
    pub const MIN_SIZE: usize = DEPOSITS_OFFSET;

    /// Parse with the lenient deposit-list policy
    pub fn parse(data: &[u8]) -> Result<Self, TransactionBuilderError> {
        Self::parse_with_policy(data, ParsePolicy::Lenient)
    }

    pub fn parse_with_policy(
        data: &[u8],
        policy: ParsePolicy,
    ) -> Result<Self, TransactionBuilderError> {
        let r = AccountReader::new(Self::RECORD, data, Self::MIN_SIZE)?;
        Ok(Self {
            version: r.u8("version", VERSION_OFFSET)?,
            last_update_slot: r.u64_le("last_update_slot", LAST_UPDATE_SLOT_OFFSET)?,
            lending_market: r.pubkey("lending_market", LENDING_MARKET_OFFSET)?,
            owner: r.pubkey("owner", OWNER_OFFSET)?,
            deposited_value: r.u128_le("deposited_value", DEPOSITED_VALUE_OFFSET)?,
            borrowed_value: r.u128_le("borrowed_value", BORROWED_VALUE_OFFSET)?,
            allowed_borrow_value: r.u128_le("allowed_borrow_value", ALLOWED_BORROW_VALUE_OFFSET)?,
            unhealthy_borrow_value: r
                .u128_le("unhealthy_borrow_value", UNHEALTHY_BORROW_VALUE_OFFSET)?,
            deposits: parse_deposits(&r, policy)?,
        })
    }

    /// Reserves the obligation holds collateral in, in stored order
    pub fn deposit_reserves(&self) -> Vec<Pubkey> {
        self.deposits.iter().map(|d| d.deposit_reserve).collect()
    }
}

fn parse_deposits(
    r: &AccountReader<'_>,
    policy: ParsePolicy,
) -> Result<Vec<ObligationDeposit>, TransactionBuilderError> {
    let count = r.u16_le("deposits_len", DEPOSITS_LEN_OFFSET)? as usize;

    if count > MAX_OBLIGATION_DEPOSITS {
        return degrade(
            policy,
            r,
            format!(
                "declared {} deposits, ceiling is {}",
                count, MAX_OBLIGATION_DEPOSITS
            ),
        );
    }

    let required = DEPOSITS_OFFSET + count * OBLIGATION_DEPOSIT_LEN;
    if r.len() < required {
        return degrade(
            policy,
            r,
            format!(
                "{} deposits need {} bytes, buffer is {} bytes",
                count,
                required,
                r.len()
            ),
        );
    }

    let mut deposits = Vec::with_capacity(count);
    for i in 0..count {
        let base = DEPOSITS_OFFSET + i * OBLIGATION_DEPOSIT_LEN;
        deposits.push(ObligationDeposit {
            deposit_reserve: r.pubkey("deposit_reserve", base + DEPOSIT_RESERVE_REL)?,
            deposited_amount: r.u64_le("deposited_amount", base + DEPOSITED_AMOUNT_REL)?,
            market_value: r.u128_le("market_value", base + MARKET_VALUE_REL)?,
        });
    }
    Ok(deposits)
}

fn degrade(
    policy: ParsePolicy,
    r: &AccountReader<'_>,
    reason: String,
) -> Result<Vec<ObligationDeposit>, TransactionBuilderError> {
    match policy {
        ParsePolicy::Strict => Err(TransactionBuilderError::malformed(r.record(), reason)),
        ParsePolicy::Lenient => {
            warn!(record = r.record(), %reason, "Obligation deposits unreadable, using empty list");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) fn obligation_bytes(
        market: &Pubkey,
        owner: &Pubkey,
        deposits: &[(Pubkey, u64)],
    ) -> Vec<u8> {
        let mut data = vec![0u8; OBLIGATION_ACCOUNT_LEN];
        data[VERSION_OFFSET] = 1;
        data[LENDING_MARKET_OFFSET..LENDING_MARKET_OFFSET + 32].copy_from_slice(market.as_ref());
        data[OWNER_OFFSET..OWNER_OFFSET + 32].copy_from_slice(owner.as_ref());
        data[DEPOSITS_LEN_OFFSET..DEPOSITS_LEN_OFFSET + 2]
            .copy_from_slice(&(deposits.len() as u16).to_le_bytes());
        for (i, (reserve, amount)) in deposits.iter().enumerate() {
            let base = DEPOSITS_OFFSET + i * OBLIGATION_DEPOSIT_LEN;
            data[base..base + 32].copy_from_slice(reserve.as_ref());
            data[base + 32..base + 40].copy_from_slice(&amount.to_le_bytes());
        }
        data
    }

    fn with_count(count: u16, len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[DEPOSITS_LEN_OFFSET..DEPOSITS_LEN_OFFSET + 2].copy_from_slice(&count.to_le_bytes());
        data
    }

    #[test]
    fn test_min_size_boundary() {
        assert!(ParsedObligation::parse(&vec![0u8; ParsedObligation::MIN_SIZE - 1]).is_err());

        let obligation = ParsedObligation::parse(&vec![0u8; ParsedObligation::MIN_SIZE]).unwrap();
        assert_eq!(obligation.version, 0);
        assert_eq!(obligation.owner, Pubkey::default());
        assert_eq!(obligation.deposited_value, 0);
        assert!(obligation.deposits.is_empty());
    }

    #[test]
    fn test_parses_deposits_in_order() {
        let market = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let data = obligation_bytes(&market, &owner, &[(a, 5), (b, 7)]);

        let obligation = ParsedObligation::parse(&data).unwrap();
        assert_eq!(obligation.lending_market, market);
        assert_eq!(obligation.owner, owner);
        assert_eq!(obligation.deposit_reserves(), vec![a, b]);
        assert_eq!(obligation.deposits[1].deposited_amount, 7);
    }

    #[test]
    fn test_count_above_ceiling_degrades_to_empty() {
        let data = with_count(11, OBLIGATION_ACCOUNT_LEN);
        let obligation = ParsedObligation::parse(&data).unwrap();
        assert!(obligation.deposits.is_empty());

        let err = ParsedObligation::parse_with_policy(&data, ParsePolicy::Strict).unwrap_err();
        assert!(matches!(err, TransactionBuilderError::MalformedAccount { .. }));
    }

    #[test]
    fn test_truncated_entries_yield_no_partial_data() {
        // room for one entry, two declared
        let data = with_count(2, DEPOSITS_OFFSET + OBLIGATION_DEPOSIT_LEN);
        let obligation = ParsedObligation::parse(&data).unwrap();
        assert!(obligation.deposits.is_empty());

        assert!(ParsedObligation::parse_with_policy(&data, ParsePolicy::Strict).is_err());
    }

    #[test]
    fn test_exact_fit_reads_all_entries() {
        let data = with_count(3, DEPOSITS_OFFSET + 3 * OBLIGATION_DEPOSIT_LEN);
        let obligation = ParsedObligation::parse_with_policy(&data, ParsePolicy::Strict).unwrap();
        assert_eq!(obligation.deposits.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let _ = ParsedObligation::parse(&data);
            let _ = ParsedObligation::parse_with_policy(&data, ParsePolicy::Strict);
        }
    }
}
