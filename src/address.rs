//! Address deriver
//!
//! Pure address computations. Nothing here knows whether the resulting
//! account exists on chain; that is a fact supplied with the context.

use solana_sdk::pubkey::Pubkey;

use crate::tx_builder::errors::TransactionBuilderError;

/// Maximum seed length accepted by `create_with_seed`
pub const MAX_SEED_LEN: usize = 32;

/// Parse Base58 text into a 32-byte address
pub fn parse_address(value: &str) -> Result<Pubkey, TransactionBuilderError> {
    let bytes = bs58::decode(value.trim())
        .into_vec()
        .map_err(|e| TransactionBuilderError::InvalidAddress {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
    let array: [u8; 32] =
        bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| TransactionBuilderError::InvalidAddress {
                value: value.to_string(),
                reason: format!("decoded to {} bytes, expected 32", bytes.len()),
            })?;
    Ok(Pubkey::new_from_array(array))
}

/// Associated token account for (owner, mint) under the classic token program
///
/// Seeds are `[owner, token program, mint]` under the associated token
/// account program.
pub fn derive_associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address_with_program_id(
        owner,
        mint,
        &spl_token::id(),
    )
}

/// Seed binding an obligation to one market: the market's Base58 text cut to
/// 32 characters
pub fn obligation_seed(lending_market: &Pubkey) -> String {
    let text = lending_market.to_string();
    text.chars().take(MAX_SEED_LEN).collect()
}

/// Per-user obligation account for a market
pub fn derive_obligation_address(
    owner: &Pubkey,
    lending_market: &Pubkey,
    lending_program: &Pubkey,
) -> Result<Pubkey, TransactionBuilderError> {
    Pubkey::create_with_seed(owner, &obligation_seed(lending_market), lending_program)
        .map_err(|e| TransactionBuilderError::AddressDerivation(format!("obligation: {}", e)))
}

/// Market authority from the bump seed stored in the market record
pub fn derive_market_authority(
    lending_market: &Pubkey,
    bump_seed: u8,
    lending_program: &Pubkey,
) -> Result<Pubkey, TransactionBuilderError> {
    Pubkey::create_program_address(&[lending_market.as_ref(), &[bump_seed]], lending_program)
        .map_err(|e| {
            TransactionBuilderError::AddressDerivation(format!(
                "market authority (bump {}): {}",
                bump_seed, e
            ))
        })
}
