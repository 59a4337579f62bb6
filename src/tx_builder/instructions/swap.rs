//! Pre-quoted swaps
//!
//! Route discovery happens outside the builder. What arrives here is the
//! aggregator's instruction list plus the lookup tables it references; the
//! encoder checks it against the request and the program allow-list and
//! carries it through unchanged.

use solana_sdk::{compute_budget, pubkey::Pubkey, system_program};
use tracing::debug;

use super::InstructionPlan;
use crate::registry::Token;
use crate::tx_builder::context::SwapContext;
use crate::tx_builder::errors::TransactionBuilderError;

/// Programs a swap may use for account setup around the swap itself
pub fn infrastructure_programs() -> [Pubkey; 4] {
    [
        compute_budget::id(),
        system_program::id(),
        spl_token::id(),
        spl_associated_token_account::id(),
    ]
}

/// Whether the instruction list already sets its own compute budget
pub fn has_compute_budget(plans: &[InstructionPlan]) -> bool {
    plans.iter().any(|p| p.program_id == compute_budget::id())
}

fn label_for(program_id: &Pubkey, allowed: &[Pubkey]) -> &'static str {
    if allowed.contains(program_id) {
        "swap"
    } else if *program_id == compute_budget::id() {
        "swap_compute_budget"
    } else {
        "swap_setup"
    }
}

/// Validate a quoted swap and turn it into instruction plans
///
/// Rejects programs outside the allow-list and infrastructure set, signers
/// other than the owner, and quotes that disagree with the request.
pub fn plan_swap(
    owner: &Pubkey,
    context: &SwapContext,
    allowed_programs: &[Pubkey],
    input: Token,
    output: Token,
    amount: u64,
) -> Result<Vec<InstructionPlan>, TransactionBuilderError> {
    if input == output {
        return Err(TransactionBuilderError::invalid_param(
            "outputToken",
            format!("cannot swap {} into itself", input),
        ));
    }
    if context.input_mint != input.mint() {
        return Err(TransactionBuilderError::invalid_context(
            "inputMint",
            format!("quote is for {}, request is {}", context.input_mint, input),
        ));
    }
    if context.output_mint != output.mint() {
        return Err(TransactionBuilderError::invalid_context(
            "outputMint",
            format!("quote is for {}, request is {}", context.output_mint, output),
        ));
    }
    if context.in_amount != amount {
        return Err(TransactionBuilderError::invalid_context(
            "inAmount",
            format!("quote is for {} units, request is {}", context.in_amount, amount),
        ));
    }
    if context.out_amount == 0 {
        return Err(TransactionBuilderError::invalid_context("outAmount", "quote returns nothing"));
    }
    if context.instructions.is_empty() {
        return Err(TransactionBuilderError::missing("swap instructions"));
    }

    let infrastructure = infrastructure_programs();
    let mut plans = Vec::with_capacity(context.instructions.len());
    for ix in &context.instructions {
        if !allowed_programs.contains(&ix.program_id) && !infrastructure.contains(&ix.program_id) {
            return Err(TransactionBuilderError::invalid_context(
                "instructions.programId",
                format!("program {} is not allowed", ix.program_id),
            ));
        }
        if let Some(foreign) = ix.accounts.iter().find(|m| m.is_signer && m.pubkey != *owner) {
            return Err(TransactionBuilderError::invalid_context(
                "instructions.accounts",
                format!("unexpected signer {}", foreign.pubkey),
            ));
        }
        plans.push(InstructionPlan::new(
            label_for(&ix.program_id, allowed_programs),
            ix.program_id,
            ix.accounts.iter().map(Into::into).collect(),
            ix.data.clone(),
        ));
    }

    if !plans.iter().any(|p| allowed_programs.contains(&p.program_id)) {
        return Err(TransactionBuilderError::invalid_context(
            "instructions",
            "no instruction targets an allowed swap program",
        ));
    }

    debug!(
        input = %input,
        output = %output,
        in_amount = context.in_amount,
        out_amount = context.out_amount,
        instructions = plans.len(),
        lookup_tables = context.lookup_tables.len(),
        "Accepted quoted swap"
    );
    Ok(plans)
}
