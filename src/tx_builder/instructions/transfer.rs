//! Native and token transfers
//!
//! A transfer is native (system program) when no token, or SOL, is
//! requested; otherwise it is a checked token transfer between the two
//! associated token accounts. An optional memo always goes last.

#[allow(deprecated)]
use solana_sdk::system_instruction;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use super::InstructionPlan;
use crate::address::derive_associated_token_address;
use crate::registry::Token;
use crate::tx_builder::context::TransferContext;
use crate::tx_builder::errors::TransactionBuilderError;

/// Longest memo accepted, in bytes
pub const MAX_MEMO_LEN: usize = 566;

/// Memo program helper
pub mod memo {
    use solana_sdk::{pubkey, pubkey::Pubkey};

    use crate::tx_builder::instructions::InstructionPlan;

    pub const MEMO_PROGRAM_ID: Pubkey = pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

    /// Memo with no signer accounts; the text is the raw payload
    pub fn build_memo(text: &str) -> InstructionPlan {
        InstructionPlan::new("memo", MEMO_PROGRAM_ID, Vec::new(), text.as_bytes().to_vec())
    }
}

/// Accounts resolved for a token transfer
#[derive(Debug, Clone, Copy)]
pub struct TokenTransferAccounts {
    pub source: Pubkey,
    pub destination: Pubkey,
}

/// Re-derive both token accounts and compare with what the context claims
pub fn verify_transfer_context(
    owner: &Pubkey,
    recipient: &Pubkey,
    token: Token,
    context: Option<&TransferContext>,
) -> Result<TokenTransferAccounts, TransactionBuilderError> {
    let mint = token.mint();
    let source = derive_associated_token_address(owner, &mint);
    let destination = derive_associated_token_address(recipient, &mint);

    if let Some(ctx) = context {
        if let Some(supplied) = ctx.source_token_account.filter(|s| *s != source) {
            return Err(TransactionBuilderError::invalid_context(
                "sourceTokenAccount",
                format!("expected {}, context has {}", source, supplied),
            ));
        }
        if let Some(supplied) = ctx.destination_token_account.filter(|d| *d != destination) {
            return Err(TransactionBuilderError::invalid_context(
                "destinationTokenAccount",
                format!("expected {}, context has {}", destination, supplied),
            ));
        }
    }

    Ok(TokenTransferAccounts { source, destination })
}

fn validate_memo(memo: &str) -> Result<(), TransactionBuilderError> {
    if memo.len() > MAX_MEMO_LEN {
        return Err(TransactionBuilderError::invalid_param(
            "memo",
            format!("{} bytes exceeds maximum of {}", memo.len(), MAX_MEMO_LEN),
        ));
    }
    Ok(())
}

/// Instructions for sending `amount` smallest units to `recipient`
///
/// Token transfers require the transfer context: it states whether the
/// recipient's token account exists, and its claimed token accounts are
/// checked against the derived ones.
#[allow(deprecated)]
pub fn plan_transfer(
    owner: &Pubkey,
    recipient: &Pubkey,
    token: Option<Token>,
    amount: u64,
    memo: Option<&str>,
    context: Option<&TransferContext>,
) -> Result<Vec<InstructionPlan>, TransactionBuilderError> {
    if *recipient == Pubkey::default() {
        return Err(TransactionBuilderError::invalid_param("recipient", "zero address"));
    }
    if amount == 0 {
        return Err(TransactionBuilderError::invalid_param("amount", "must be greater than zero"));
    }
    if let Some(text) = memo {
        validate_memo(text)?;
    }

    let mut plans = Vec::with_capacity(3);
    match token.filter(|t| !t.is_native()) {
        None => {
            plans.push(InstructionPlan::from_instruction(
                "system_transfer",
                system_instruction::transfer(owner, recipient, amount),
            ));
            debug!(%recipient, lamports = amount, "Encoded native transfer");
        }
        Some(token) => {
            let ctx = context.ok_or_else(|| TransactionBuilderError::missing("transfer context"))?;
            let accounts = verify_transfer_context(owner, recipient, token, Some(ctx))?;
            if !ctx.destination_account_exists {
                plans.push(InstructionPlan::from_instruction(
                    "create_recipient_account",
                    spl_associated_token_account::instruction::create_associated_token_account_idempotent(
                        owner,
                        recipient,
                        &token.mint(),
                        &spl_token::id(),
                    ),
                ));
            }
            let ix = spl_token::instruction::transfer_checked(
                &spl_token::id(),
                &accounts.source,
                &token.mint(),
                &accounts.destination,
                owner,
                &[],
                amount,
                token.decimals(),
            )
            .map_err(|e| TransactionBuilderError::instruction_failed("spl_token", e.to_string()))?;
            debug!(
                %recipient,
                token = %token,
                amount,
                payload = %hex::encode(&ix.data),
                "Encoded token transfer"
            );
            plans.push(InstructionPlan::from_instruction("token_transfer", ix));
        }
    }

    if let Some(text) = memo.filter(|m| !m.is_empty()) {
        plans.push(memo::build_memo(text));
    }

    Ok(plans)
}
