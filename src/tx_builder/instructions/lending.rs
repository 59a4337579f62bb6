//! Lending program instructions
//!
//! Discriminators and account orders below are those of the token-lending
//! program (Solend v2 instruction set). They are external facts: changing
//! any of them changes what the program does with the transaction.
//!
//! Amount-bearing payloads are 9 bytes: the discriminator followed by the
//! amount in smallest units as u64 little-endian.

#[allow(deprecated)]
use solana_sdk::system_instruction;
use solana_sdk::{pubkey, pubkey::Pubkey, rent::Rent, sysvar};
use tracing::debug;

use super::{AccountRef, InstructionPlan};
use crate::address::{
    derive_associated_token_address, derive_market_authority, derive_obligation_address,
    obligation_seed,
};
use crate::layout::obligation::OBLIGATION_ACCOUNT_LEN;
use crate::registry::Token;
use crate::tx_builder::context::LendingContext;
use crate::tx_builder::errors::TransactionBuilderError;

/// Main-deployment lending program
pub const LENDING_PROGRAM_ID: Pubkey = pubkey!("So1endDq2YkqhipRh3WViPa8hdiSpxWy6z3Z6tMCpAo");

pub const INIT_OBLIGATION_DISCRIMINATOR: u8 = 6;
/// DepositReserveLiquidityAndObligationCollateral
pub const DEPOSIT_DISCRIMINATOR: u8 = 14;
/// WithdrawObligationCollateralAndRedeemReserveCollateral
pub const WITHDRAW_DISCRIMINATOR: u8 = 15;

pub const AMOUNT_PAYLOAD_LEN: usize = 9;
pub const DEPOSIT_ACCOUNT_COUNT: usize = 14;
/// Withdraw accounts before the trailing obligation deposit reserves
pub const WITHDRAW_BASE_ACCOUNT_COUNT: usize = 12;

/// `[discriminator, amount as u64 LE]`
pub fn encode_amount_payload(discriminator: u8, amount: u64) -> [u8; AMOUNT_PAYLOAD_LEN] {
    let mut payload = [0u8; AMOUNT_PAYLOAD_LEN];
    payload[0] = discriminator;
    payload[1..].copy_from_slice(&amount.to_le_bytes());
    payload
}

/// Accounts of the combined deposit instruction
#[derive(Debug, Clone, Copy)]
pub struct DepositAccounts {
    pub source_liquidity: Pubkey,
    pub user_collateral: Pubkey,
    pub reserve: Pubkey,
    pub reserve_liquidity_supply: Pubkey,
    pub reserve_collateral_mint: Pubkey,
    pub lending_market: Pubkey,
    pub lending_market_authority: Pubkey,
    pub reserve_collateral_supply: Pubkey,
    pub obligation: Pubkey,
    pub obligation_owner: Pubkey,
    pub pyth_oracle: Pubkey,
    pub switchboard_oracle: Pubkey,
    /// Signs the liquidity transfer; normally the obligation owner again
    pub user_transfer_authority: Pubkey,
}

/// Accounts of the combined withdraw instruction
#[derive(Debug, Clone)]
pub struct WithdrawAccounts {
    pub reserve_collateral_supply: Pubkey,
    pub user_collateral: Pubkey,
    pub reserve: Pubkey,
    pub obligation: Pubkey,
    pub lending_market: Pubkey,
    pub lending_market_authority: Pubkey,
    pub user_liquidity: Pubkey,
    pub reserve_collateral_mint: Pubkey,
    pub reserve_liquidity_supply: Pubkey,
    pub obligation_owner: Pubkey,
    pub user_transfer_authority: Pubkey,
    /// Every reserve the obligation holds collateral in
    pub deposit_reserves: Vec<Pubkey>,
}

/// Deposit liquidity, mint collateral and lock it in the obligation
pub fn deposit_reserve_liquidity_and_obligation_collateral(
    program_id: &Pubkey,
    accounts: &DepositAccounts,
    liquidity_amount: u64,
) -> InstructionPlan {
    InstructionPlan::new(
        "lending_deposit",
        *program_id,
        vec![
            AccountRef::writable(accounts.source_liquidity),
            AccountRef::writable(accounts.user_collateral),
            AccountRef::writable(accounts.reserve),
            AccountRef::writable(accounts.reserve_liquidity_supply),
            AccountRef::writable(accounts.reserve_collateral_mint),
            AccountRef::readonly(accounts.lending_market),
            AccountRef::readonly(accounts.lending_market_authority),
            AccountRef::writable(accounts.reserve_collateral_supply),
            AccountRef::writable(accounts.obligation),
            AccountRef::writable_signer(accounts.obligation_owner),
            AccountRef::readonly(accounts.pyth_oracle),
            AccountRef::readonly(accounts.switchboard_oracle),
            AccountRef::readonly_signer(accounts.user_transfer_authority),
            AccountRef::readonly(spl_token::id()),
        ],
        encode_amount_payload(DEPOSIT_DISCRIMINATOR, liquidity_amount).to_vec(),
    )
}

/// Unlock collateral from the obligation and redeem it for liquidity
pub fn withdraw_obligation_collateral_and_redeem_reserve_collateral(
    program_id: &Pubkey,
    accounts: &WithdrawAccounts,
    collateral_amount: u64,
) -> InstructionPlan {
    let mut metas = Vec::with_capacity(WITHDRAW_BASE_ACCOUNT_COUNT + accounts.deposit_reserves.len());
    metas.extend([
        AccountRef::writable(accounts.reserve_collateral_supply),
        AccountRef::writable(accounts.user_collateral),
        AccountRef::writable(accounts.reserve),
        AccountRef::writable(accounts.obligation),
        AccountRef::readonly(accounts.lending_market),
        AccountRef::readonly(accounts.lending_market_authority),
        AccountRef::writable(accounts.user_liquidity),
        AccountRef::writable(accounts.reserve_collateral_mint),
        AccountRef::writable(accounts.reserve_liquidity_supply),
        AccountRef::readonly_signer(accounts.obligation_owner),
        AccountRef::readonly_signer(accounts.user_transfer_authority),
        AccountRef::readonly(spl_token::id()),
    ]);
    metas.extend(accounts.deposit_reserves.iter().copied().map(AccountRef::writable));

    InstructionPlan::new(
        "lending_withdraw",
        *program_id,
        metas,
        encode_amount_payload(WITHDRAW_DISCRIMINATOR, collateral_amount).to_vec(),
    )
}

/// Initialize a freshly allocated obligation account
pub fn init_obligation(
    program_id: &Pubkey,
    obligation: &Pubkey,
    lending_market: &Pubkey,
    obligation_owner: &Pubkey,
) -> InstructionPlan {
    InstructionPlan::new(
        "lending_init_obligation",
        *program_id,
        vec![
            AccountRef::writable(*obligation),
            AccountRef::readonly(*lending_market),
            AccountRef::readonly_signer(*obligation_owner),
            AccountRef::readonly(sysvar::rent::id()),
            AccountRef::readonly(spl_token::id()),
        ],
        vec![INIT_OBLIGATION_DISCRIMINATOR],
    )
}

/// Allocate the seed-derived obligation account, rent exempt
#[allow(deprecated)]
pub fn create_obligation_account(
    owner: &Pubkey,
    obligation: &Pubkey,
    lending_market: &Pubkey,
    program_id: &Pubkey,
) -> InstructionPlan {
    let lamports = Rent::default().minimum_balance(OBLIGATION_ACCOUNT_LEN);
    InstructionPlan::from_instruction(
        "create_obligation_account",
        system_instruction::create_account_with_seed(
            owner,
            obligation,
            owner,
            &obligation_seed(lending_market),
            lamports,
            OBLIGATION_ACCOUNT_LEN as u64,
            program_id,
        ),
    )
}

/// Context addresses after re-derivation and cross-checks
#[derive(Debug, Clone, Copy)]
pub struct VerifiedLendingAccounts {
    pub market_authority: Pubkey,
    pub obligation: Pubkey,
    pub user_liquidity: Pubkey,
    pub user_collateral: Pubkey,
}

fn ensure_nonzero(field: &'static str, key: &Pubkey) -> Result<(), TransactionBuilderError> {
    if *key == Pubkey::default() {
        return Err(TransactionBuilderError::invalid_context(field, "zero address"));
    }
    Ok(())
}

fn ensure_eq(
    field: &'static str,
    supplied: &Pubkey,
    expected: &Pubkey,
) -> Result<(), TransactionBuilderError> {
    if supplied != expected {
        return Err(TransactionBuilderError::invalid_context(
            field,
            format!("expected {}, context has {}", expected, supplied),
        ));
    }
    Ok(())
}

/// Cross-check an untrusted lending context against the request
///
/// Every address the context supplies is re-derived here; records must
/// belong to the configured market and to the requested token.
pub fn verify_lending_context(
    owner: &Pubkey,
    lending: &LendingContext,
    program_id: &Pubkey,
    market: &Pubkey,
    token: Token,
) -> Result<VerifiedLendingAccounts, TransactionBuilderError> {
    let reserve = &lending.reserve;

    ensure_eq("marketAddress", &lending.market_address, market)?;
    ensure_eq("reserve.lending_market", &reserve.lending_market, market)?;
    ensure_eq("reserve.liquidity_mint", &reserve.liquidity_mint, &token.mint())?;
    if reserve.liquidity_decimals != token.decimals() {
        return Err(TransactionBuilderError::invalid_context(
            "reserve.liquidity_decimals",
            format!(
                "{} has {} decimals, reserve reports {}",
                token,
                token.decimals(),
                reserve.liquidity_decimals
            ),
        ));
    }
    ensure_nonzero("reserve.liquidity_supply", &reserve.liquidity_supply)?;
    ensure_nonzero("reserve.collateral_mint", &reserve.collateral_mint)?;
    ensure_nonzero("reserve.collateral_supply", &reserve.collateral_supply)?;

    let obligation = derive_obligation_address(owner, market, program_id)?;
    ensure_eq("obligationAddress", &lending.obligation_address, &obligation)?;
    if let Some(parsed) = &lending.obligation {
        ensure_eq("obligation.owner", &parsed.owner, owner)?;
        ensure_eq("obligation.lending_market", &parsed.lending_market, market)?;
    }

    let user_liquidity = derive_associated_token_address(owner, &reserve.liquidity_mint);
    ensure_eq("userLiquidityAccount", &lending.user_liquidity_account, &user_liquidity)?;
    let user_collateral = derive_associated_token_address(owner, &reserve.collateral_mint);
    ensure_eq("userCollateralAccount", &lending.user_collateral_account, &user_collateral)?;

    let market_authority = derive_market_authority(market, lending.market.bump_seed, program_id)?;

    Ok(VerifiedLendingAccounts {
        market_authority,
        obligation,
        user_liquidity,
        user_collateral,
    })
}

fn create_ata_idempotent(owner: &Pubkey, mint: &Pubkey, label: &'static str) -> InstructionPlan {
    InstructionPlan::from_instruction(
        label,
        spl_associated_token_account::instruction::create_associated_token_account_idempotent(
            owner,
            owner,
            mint,
            &spl_token::id(),
        ),
    )
}

fn token_instruction(
    label: &'static str,
    built: Result<solana_sdk::instruction::Instruction, solana_sdk::program_error::ProgramError>,
) -> Result<InstructionPlan, TransactionBuilderError> {
    built
        .map(|ix| InstructionPlan::from_instruction(label, ix))
        .map_err(|e| TransactionBuilderError::instruction_failed("spl_token", e.to_string()))
}

fn close_wrapped_sol(
    owner: &Pubkey,
    account: &Pubkey,
) -> Result<InstructionPlan, TransactionBuilderError> {
    token_instruction(
        "close_wrapped_sol",
        spl_token::instruction::close_account(&spl_token::id(), account, owner, owner, &[]),
    )
}

/// Instructions for a deposit of `amount` smallest units of `token`
///
/// Order: obligation bootstrap (if absent), collateral account creation (if
/// absent), SOL wrapping (native only), the deposit itself, SOL account
/// close (native only).
#[allow(deprecated)]
pub fn plan_deposit(
    owner: &Pubkey,
    lending: &LendingContext,
    program_id: &Pubkey,
    market: &Pubkey,
    token: Token,
    amount: u64,
) -> Result<Vec<InstructionPlan>, TransactionBuilderError> {
    let verified = verify_lending_context(owner, lending, program_id, market, token)?;
    let reserve = &lending.reserve;
    let mut plans = Vec::with_capacity(7);

    if lending.obligation.is_none() {
        plans.push(create_obligation_account(owner, &verified.obligation, market, program_id));
        plans.push(init_obligation(program_id, &verified.obligation, market, owner));
    }

    if !lending.user_collateral_account_exists {
        plans.push(create_ata_idempotent(
            owner,
            &reserve.collateral_mint,
            "create_collateral_account",
        ));
    }

    if token.is_native() {
        plans.push(create_ata_idempotent(owner, &token.mint(), "create_wrapped_sol_account"));
        plans.push(InstructionPlan::from_instruction(
            "wrap_sol",
            system_instruction::transfer(owner, &verified.user_liquidity, amount),
        ));
        plans.push(token_instruction(
            "sync_native",
            spl_token::instruction::sync_native(&spl_token::id(), &verified.user_liquidity),
        )?);
    }

    let accounts = DepositAccounts {
        source_liquidity: verified.user_liquidity,
        user_collateral: verified.user_collateral,
        reserve: lending.reserve_address,
        reserve_liquidity_supply: reserve.liquidity_supply,
        reserve_collateral_mint: reserve.collateral_mint,
        lending_market: *market,
        lending_market_authority: verified.market_authority,
        reserve_collateral_supply: reserve.collateral_supply,
        obligation: verified.obligation,
        obligation_owner: *owner,
        pyth_oracle: reserve.pyth_oracle,
        switchboard_oracle: reserve.switchboard_oracle,
        user_transfer_authority: *owner,
    };
    let deposit = deposit_reserve_liquidity_and_obligation_collateral(program_id, &accounts, amount);
    debug!(
        reserve = %lending.reserve_address,
        obligation = %verified.obligation,
        amount,
        payload = %hex::encode(&deposit.data),
        "Encoded lending deposit"
    );
    plans.push(deposit);

    if token.is_native() {
        plans.push(close_wrapped_sol(owner, &verified.user_liquidity)?);
    }

    Ok(plans)
}

/// Instructions for a withdraw of `amount` collateral smallest units
///
/// The obligation must already exist; its deposit reserves are appended to
/// the withdraw account list in stored order.
pub fn plan_withdraw(
    owner: &Pubkey,
    lending: &LendingContext,
    program_id: &Pubkey,
    market: &Pubkey,
    token: Token,
    amount: u64,
) -> Result<Vec<InstructionPlan>, TransactionBuilderError> {
    let verified = verify_lending_context(owner, lending, program_id, market, token)?;
    let obligation = lending.obligation.as_ref().ok_or_else(|| {
        TransactionBuilderError::missing(format!(
            "obligation {} does not exist; nothing to withdraw",
            verified.obligation
        ))
    })?;
    let reserve = &lending.reserve;
    let mut plans = Vec::with_capacity(4);

    if !lending.user_collateral_account_exists {
        plans.push(create_ata_idempotent(
            owner,
            &reserve.collateral_mint,
            "create_collateral_account",
        ));
    }
    if token.is_native() {
        plans.push(create_ata_idempotent(owner, &token.mint(), "create_wrapped_sol_account"));
    }

    let accounts = WithdrawAccounts {
        reserve_collateral_supply: reserve.collateral_supply,
        user_collateral: verified.user_collateral,
        reserve: lending.reserve_address,
        obligation: verified.obligation,
        lending_market: *market,
        lending_market_authority: verified.market_authority,
        user_liquidity: verified.user_liquidity,
        reserve_collateral_mint: reserve.collateral_mint,
        reserve_liquidity_supply: reserve.liquidity_supply,
        obligation_owner: *owner,
        user_transfer_authority: *owner,
        deposit_reserves: obligation.deposit_reserves(),
    };
    let withdraw =
        withdraw_obligation_collateral_and_redeem_reserve_collateral(program_id, &accounts, amount);
    debug!(
        reserve = %lending.reserve_address,
        obligation = %verified.obligation,
        amount,
        deposit_reserves = accounts.deposit_reserves.len(),
        payload = %hex::encode(&withdraw.data),
        "Encoded lending withdraw"
    );
    plans.push(withdraw);

    if token.is_native() {
        plans.push(close_wrapped_sol(owner, &verified.user_liquidity)?);
    }

    Ok(plans)
}
