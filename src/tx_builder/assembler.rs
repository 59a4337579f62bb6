//! Transaction assembly and limit validation
//!
//! Instruction plans are compiled in the order given; nothing is reordered,
//! merged or deduplicated. Every signature slot is left zeroed for the
//! signer downstream.
//!
//! ## Limits
//! - 1 to `max_instructions` instructions, advisory above the threshold
//! - serialized size at most `max_transaction_size`, advisory above the
//!   warning fraction

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    instruction::Instruction,
    message::{v0, Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use tracing::{info, warn};

use crate::compat;
use crate::config::LimitsConfig;
use crate::tx_builder::context::Lifetime;
use crate::tx_builder::errors::TransactionBuilderError;
use crate::tx_builder::instructions::InstructionPlan;
use crate::tx_builder::output::{Advisory, AdvisoryKind, WireTransaction};

/// Check the instruction count against the configured limits
pub fn validate_instruction_count(
    count: usize,
    limits: &LimitsConfig,
) -> Result<Option<Advisory>, TransactionBuilderError> {
    if count == 0 {
        return Err(TransactionBuilderError::NoInstructions {
            max: limits.max_instructions,
        });
    }
    if count > limits.max_instructions {
        return Err(TransactionBuilderError::TooManyInstructions {
            count,
            max: limits.max_instructions,
        });
    }
    if count > limits.instruction_warning_threshold {
        return Ok(Some(Advisory::new(
            AdvisoryKind::ManyInstructions,
            format!(
                "{} instructions exceeds the advisory threshold of {}",
                count, limits.instruction_warning_threshold
            ),
        )));
    }
    Ok(None)
}

/// Check a serialized size against the configured limits
pub fn validate_transaction_size(
    size: usize,
    limits: &LimitsConfig,
) -> Result<Option<Advisory>, TransactionBuilderError> {
    if size > limits.max_transaction_size {
        return Err(TransactionBuilderError::TransactionTooLarge {
            size,
            max: limits.max_transaction_size,
        });
    }
    let threshold = limits.size_warning_threshold();
    if size > threshold {
        return Ok(Some(Advisory::new(
            AdvisoryKind::SizeNearLimit,
            format!(
                "{} bytes is above {} bytes ({}% of the {} byte limit)",
                size,
                threshold,
                (limits.size_warning_ratio * 100.0).round(),
                limits.max_transaction_size
            ),
        )));
    }
    Ok(None)
}

fn compile_message(
    payer: &Pubkey,
    lifetime: &Lifetime,
    instructions: &[Instruction],
    lookup_tables: &[AddressLookupTableAccount],
) -> Result<VersionedMessage, TransactionBuilderError> {
    if lookup_tables.is_empty() {
        return Ok(VersionedMessage::Legacy(Message::new_with_blockhash(
            instructions,
            Some(payer),
            &lifetime.blockhash,
        )));
    }
    v0::Message::try_compile(payer, instructions, lookup_tables, lifetime.blockhash)
        .map(VersionedMessage::V0)
        .map_err(|e| TransactionBuilderError::Serialization(format!("v0 message compile: {}", e)))
}

/// Compile, serialize and validate an unsigned transaction
///
/// Returns the wire form together with any advisories. The fee payer is
/// always the first required signer.
pub fn assemble(
    payer: &Pubkey,
    lifetime: &Lifetime,
    plans: &[InstructionPlan],
    lookup_tables: &[AddressLookupTableAccount],
    limits: &LimitsConfig,
) -> Result<(WireTransaction, Vec<Advisory>), TransactionBuilderError> {
    let mut advisories = Vec::new();
    advisories.extend(validate_instruction_count(plans.len(), limits)?);

    let instructions: Vec<Instruction> = plans.iter().map(InstructionPlan::to_instruction).collect();
    let message = compile_message(payer, lifetime, &instructions, lookup_tables)?;

    let num_signatures = compat::get_num_required_signatures(&message) as usize;
    let transaction = VersionedTransaction {
        signatures: vec![Signature::default(); num_signatures],
        message,
    };
    let wire = bincode::serialize(&transaction)
        .map_err(|e| TransactionBuilderError::Serialization(e.to_string()))?;

    advisories.extend(validate_transaction_size(wire.len(), limits)?);

    let version = compat::message_version(&transaction.message);
    let required_signers = compat::get_required_signers(&transaction.message)
        .iter()
        .map(Pubkey::to_string)
        .collect();

    info!(
        size = wire.len(),
        max = limits.max_transaction_size,
        instructions = plans.len(),
        signers = num_signatures,
        lookup_tables = compat::lookup_table_count(&transaction.message),
        version = ?version,
        "Assembled unsigned transaction"
    );
    for advisory in &advisories {
        warn!(kind = ?advisory.kind, "{}", advisory.message);
    }

    Ok((
        WireTransaction {
            base64: BASE64_STANDARD.encode(&wire),
            size: wire.len(),
            version,
            required_signers,
            instruction_count: plans.len(),
            transaction,
        },
        advisories,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx_builder::instructions::transfer::memo::MEMO_PROGRAM_ID;
    use crate::tx_builder::instructions::AccountRef;
    use crate::tx_builder::output::MessageVersion;
    use solana_sdk::hash::Hash;

    fn lifetime() -> Lifetime {
        Lifetime {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 100,
        }
    }

    fn memo_plan(len: usize) -> InstructionPlan {
        InstructionPlan::new("memo", MEMO_PROGRAM_ID, vec![], vec![b'a'; len])
    }

    #[test]
    fn test_instruction_count_bounds() {
        let limits = LimitsConfig::default();
        assert_eq!(
            validate_instruction_count(0, &limits),
            Err(TransactionBuilderError::NoInstructions { max: 64 })
        );
        assert_eq!(validate_instruction_count(1, &limits), Ok(None));
        assert_eq!(validate_instruction_count(10, &limits), Ok(None));
        assert!(validate_instruction_count(11, &limits).unwrap().is_some());
        assert!(validate_instruction_count(64, &limits).is_ok());
        assert_eq!(
            validate_instruction_count(65, &limits),
            Err(TransactionBuilderError::TooManyInstructions { count: 65, max: 64 })
        );
    }

    #[test]
    fn test_size_bounds() {
        let limits = LimitsConfig::default();
        assert_eq!(validate_transaction_size(1108, &limits), Ok(None));
        let advisory = validate_transaction_size(1109, &limits).unwrap().unwrap();
        assert_eq!(advisory.kind, AdvisoryKind::SizeNearLimit);
        assert!(validate_transaction_size(1232, &limits).unwrap().is_some());

        let err = validate_transaction_size(1233, &limits).unwrap_err();
        assert_eq!(err, TransactionBuilderError::TransactionTooLarge { size: 1233, max: 1232 });
        let text = err.to_string();
        assert!(text.contains("1233") && text.contains("1232"));
    }

    #[test]
    fn test_assemble_legacy_with_zeroed_signature() {
        let payer = Pubkey::new_unique();
        let (wire, advisories) =
            assemble(&payer, &lifetime(), &[memo_plan(8)], &[], &LimitsConfig::default()).unwrap();

        assert!(advisories.is_empty());
        assert_eq!(wire.version, MessageVersion::Legacy);
        assert_eq!(wire.required_signers, vec![payer.to_string()]);
        assert_eq!(wire.transaction.signatures, vec![Signature::default()]);

        let bytes = BASE64_STANDARD.decode(&wire.base64).unwrap();
        assert_eq!(bytes.len(), wire.size);
        let decoded: VersionedTransaction = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, wire.transaction);
    }

    #[test]
    fn test_assemble_preserves_order() {
        let payer = Pubkey::new_unique();
        let programs: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
        let plans: Vec<InstructionPlan> = programs
            .iter()
            .map(|p| InstructionPlan::new("test", *p, vec![AccountRef::writable_signer(payer)], vec![]))
            .collect();
        let (wire, _) = assemble(&payer, &lifetime(), &plans, &[], &LimitsConfig::default()).unwrap();

        let message = &wire.transaction.message;
        let keys = compat::get_static_account_keys(message);
        let compiled: Vec<Pubkey> = message
            .instructions()
            .iter()
            .map(|ix| keys[ix.program_id_index as usize])
            .collect();
        assert_eq!(compiled, programs);
    }

    #[test]
    fn test_assemble_size_ceiling_exact() {
        let payer = Pubkey::new_unique();
        let limits = LimitsConfig::default();
        let base = 300;
        let (probe, _) = assemble(&payer, &lifetime(), &[memo_plan(base)], &[], &limits).unwrap();

        // memo data length stays in the two-byte length prefix range
        let fit = base + (1232 - probe.size);
        let (wire, advisories) = assemble(&payer, &lifetime(), &[memo_plan(fit)], &[], &limits).unwrap();
        assert_eq!(wire.size, 1232);
        assert_eq!(advisories.len(), 1);

        let err = assemble(&payer, &lifetime(), &[memo_plan(fit + 1)], &[], &limits).unwrap_err();
        assert_eq!(err, TransactionBuilderError::TransactionTooLarge { size: 1233, max: 1232 });
    }

    #[test]
    fn test_assemble_instruction_count_limits() {
        let payer = Pubkey::new_unique();
        let limits = LimitsConfig::default();

        let err = assemble(&payer, &lifetime(), &[], &[], &limits).unwrap_err();
        assert!(matches!(err, TransactionBuilderError::NoInstructions { .. }));

        let plans: Vec<_> = (0..64).map(|_| memo_plan(1)).collect();
        let (wire, advisories) = assemble(&payer, &lifetime(), &plans, &[], &limits).unwrap();
        assert_eq!(wire.instruction_count, 64);
        assert!(advisories.iter().any(|a| a.kind == AdvisoryKind::ManyInstructions));

        let plans: Vec<_> = (0..65).map(|_| memo_plan(1)).collect();
        assert_eq!(
            assemble(&payer, &lifetime(), &plans, &[], &limits).unwrap_err(),
            TransactionBuilderError::TooManyInstructions { count: 65, max: 64 }
        );
    }

    #[test]
    fn test_assemble_v0_with_lookup_table() {
        let payer = Pubkey::new_unique();
        let looked_up = Pubkey::new_unique();
        let plan = InstructionPlan::new(
            "test",
            Pubkey::new_unique(),
            vec![AccountRef::writable_signer(payer), AccountRef::writable(looked_up)],
            vec![7],
        );
        let table = AddressLookupTableAccount {
            key: Pubkey::new_unique(),
            addresses: vec![looked_up],
        };
        let (wire, _) =
            assemble(&payer, &lifetime(), &[plan], &[table], &LimitsConfig::default()).unwrap();
        assert_eq!(wire.version, MessageVersion::V0);
        assert_eq!(compat::lookup_table_count(&wire.transaction.message), 1);
    }
}
