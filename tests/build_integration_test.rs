//! Integration tests for the full build path
//!
//! This test validates:
//! - Plain-data context in, Base64 wire transaction out
//! - Lending deposit and withdraw encoding against raw account buffers
//! - Limit enforcement at the public API
//! - Context cross-checks rejecting inconsistent bundles

use attested_tx_builder::address::{derive_associated_token_address, derive_obligation_address};
use attested_tx_builder::tx_builder::instructions::lending::{
    encode_amount_payload, DEPOSIT_ACCOUNT_COUNT, DEPOSIT_DISCRIMINATOR, LENDING_PROGRAM_ID,
    WITHDRAW_BASE_ACCOUNT_COUNT,
};
use attested_tx_builder::tx_builder::{
    OperationRequest, PreparedContextDto, TransactionBuilder, TransactionBuilderError,
};
use attested_tx_builder::{structured_logging::BuildLogger, BuilderConfig, Token};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde_json::{json, Value};
use solana_sdk::{
    hash::Hash, pubkey, pubkey::Pubkey, transaction::VersionedTransaction,
};

const MARKET: Pubkey = pubkey!("4UpD2fh7xH3VP9QQaXtsS1YY3bxzWhtfpks7FatyKvdY");

fn put(buf: &mut [u8], offset: usize, bytes: &[u8]) {
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
}

fn market_bytes() -> Vec<u8> {
    let (_, bump) = Pubkey::find_program_address(&[MARKET.as_ref()], &LENDING_PROGRAM_ID);
    let mut buf = vec![0u8; 290];
    buf[0] = 1;
    buf[1] = bump;
    put(&mut buf, 2, Pubkey::new_unique().as_ref());
    put(&mut buf, 66, spl_token::id().as_ref());
    buf
}

struct ReserveKeys {
    address: Pubkey,
    collateral_mint: Pubkey,
}

fn reserve_bytes(token: Token, collateral_mint: &Pubkey) -> Vec<u8> {
    let mut buf = vec![0u8; 619];
    buf[0] = 1;
    put(&mut buf, 10, MARKET.as_ref());
    put(&mut buf, 42, token.mint().as_ref());
    buf[74] = token.decimals();
    put(&mut buf, 75, Pubkey::new_unique().as_ref());
    put(&mut buf, 107, Pubkey::new_unique().as_ref());
    put(&mut buf, 139, Pubkey::new_unique().as_ref());
    put(&mut buf, 227, collateral_mint.as_ref());
    put(&mut buf, 267, Pubkey::new_unique().as_ref());
    buf
}

fn obligation_bytes(owner: &Pubkey, reserves: &[Pubkey]) -> Vec<u8> {
    let mut buf = vec![0u8; 1300];
    buf[0] = 1;
    put(&mut buf, 10, MARKET.as_ref());
    put(&mut buf, 42, owner.as_ref());
    put(&mut buf, 138, &(reserves.len() as u16).to_le_bytes());
    for (i, reserve) in reserves.iter().enumerate() {
        let base = 140 + i * 88;
        put(&mut buf, base, reserve.as_ref());
        put(&mut buf, base + 32, &1_000u64.to_le_bytes());
    }
    buf
}

fn lending_context(owner: &Pubkey, token: Token, obligation: Option<&[Pubkey]>) -> (Value, ReserveKeys) {
    let keys = ReserveKeys {
        address: Pubkey::new_unique(),
        collateral_mint: Pubkey::new_unique(),
    };
    let obligation_address = derive_obligation_address(owner, &MARKET, &LENDING_PROGRAM_ID).unwrap();
    let value = json!({
        "owner": owner.to_string(),
        "blockhash": Hash::new_unique().to_string(),
        "lastValidBlockHeight": 250_000_000u64,
        "lending": {
            "marketAddress": MARKET.to_string(),
            "marketData": BASE64_STANDARD.encode(market_bytes()),
            "reserveAddress": keys.address.to_string(),
            "reserveData": BASE64_STANDARD.encode(reserve_bytes(token, &keys.collateral_mint)),
            "obligationAddress": obligation_address.to_string(),
            "obligationExists": obligation.is_some(),
            "obligationData": obligation.map(|r| BASE64_STANDARD.encode(obligation_bytes(owner, r))),
            "userLiquidityAccount": derive_associated_token_address(owner, &token.mint()).to_string(),
            "userCollateralAccount": derive_associated_token_address(owner, &keys.collateral_mint).to_string(),
            "userCollateralAccountExists": true,
        }
    });
    (value, keys)
}

fn build(request: Value, context: Value) -> Result<attested_tx_builder::BuildOutput, TransactionBuilderError> {
    let request: OperationRequest = serde_json::from_value(request).unwrap();
    let context: PreparedContextDto = serde_json::from_value(context).unwrap();
    let builder = TransactionBuilder::new(BuilderConfig::default()).unwrap();
    builder.build_from_dto(&request, context, &BuildLogger::new("integration"))
}

fn decode(base64: &str) -> VersionedTransaction {
    let bytes = BASE64_STANDARD.decode(base64).unwrap();
    bincode::deserialize(&bytes).unwrap()
}

#[test]
fn test_deposit_one_usdc_end_to_end() {
    let owner = Pubkey::new_unique();
    let (context, keys) = lending_context(&owner, Token::Usdc, Some(&[]));

    let output = build(
        json!({ "operation": "deposit", "params": { "amount": "1", "token": "USDC" } }),
        context,
    )
    .unwrap();

    assert!(output.transaction.size < 1232);
    assert_eq!(output.request_id.as_deref(), Some("integration"));

    let tx = decode(&output.transaction.base64);
    assert_eq!(tx.signatures.len(), 1);
    assert_eq!(tx.signatures[0], solana_sdk::signature::Signature::default());

    let keys_in_message = tx.message.static_account_keys();
    assert_eq!(keys_in_message[0], owner);

    let instructions = tx.message.instructions();
    assert_eq!(instructions.len(), 1);
    let deposit = &instructions[0];
    assert_eq!(keys_in_message[deposit.program_id_index as usize], LENDING_PROGRAM_ID);
    assert_eq!(deposit.accounts.len(), DEPOSIT_ACCOUNT_COUNT);
    assert_eq!(deposit.data, encode_amount_payload(DEPOSIT_DISCRIMINATOR, 1_000_000).to_vec());
    assert_eq!(keys_in_message[deposit.accounts[2] as usize], keys.address);

    let metadata = serde_json::to_value(&output.metadata).unwrap();
    assert_eq!(metadata["rawAmount"], "1000000");
    assert_eq!(metadata["token"], "USDC");
}

#[test]
fn test_deposit_payload_amounts() {
    for (ui, raw) in [("0.1", 100_000u64), ("1", 1_000_000), ("10", 10_000_000)] {
        let owner = Pubkey::new_unique();
        let (context, _) = lending_context(&owner, Token::Usdc, Some(&[]));
        let output = build(
            json!({ "operation": "deposit", "params": { "amount": ui, "token": "USDC" } }),
            context,
        )
        .unwrap();

        let tx = decode(&output.transaction.base64);
        let data = &tx.message.instructions()[0].data;
        assert_eq!(data.len(), 9);
        assert_eq!(data[0], 14);
        assert_eq!(&data[1..], &raw.to_le_bytes());
    }
}

#[test]
fn test_first_deposit_bootstraps_obligation() {
    let owner = Pubkey::new_unique();
    let (context, _) = lending_context(&owner, Token::Usdc, None);

    let output = build(
        json!({ "operation": "deposit", "params": { "amount": 5, "token": "USDC" } }),
        context,
    )
    .unwrap();

    assert_eq!(
        output.metadata.instructions,
        vec!["create_obligation_account", "lending_init_obligation", "lending_deposit"]
    );
}

#[test]
fn test_withdraw_lists_obligation_reserves() {
    let owner = Pubkey::new_unique();
    let held = [Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()];
    let (context, _) = lending_context(&owner, Token::Usdc, Some(&held));

    let output = build(
        json!({ "operation": "withdraw", "params": { "amount": "2", "token": "USDC" } }),
        context,
    )
    .unwrap();

    let tx = decode(&output.transaction.base64);
    let keys = tx.message.static_account_keys();
    let withdraw = &tx.message.instructions()[0];
    assert_eq!(withdraw.data[0], 15);
    assert_eq!(withdraw.accounts.len(), WITHDRAW_BASE_ACCOUNT_COUNT + held.len());
    let tail: Vec<Pubkey> = withdraw.accounts[WITHDRAW_BASE_ACCOUNT_COUNT..]
        .iter()
        .map(|i| keys[*i as usize])
        .collect();
    assert_eq!(tail, held.to_vec());
}

#[test]
fn test_withdraw_without_obligation_is_missing_context() {
    let owner = Pubkey::new_unique();
    let (context, _) = lending_context(&owner, Token::Usdc, None);
    let err = build(
        json!({ "operation": "withdraw", "params": { "amount": "2", "token": "USDC" } }),
        context,
    )
    .unwrap_err();
    assert!(matches!(err, TransactionBuilderError::MissingContext(_)));
}

#[test]
fn test_truncated_reserve_is_rejected() {
    let owner = Pubkey::new_unique();
    let (mut context, _) = lending_context(&owner, Token::Usdc, Some(&[]));
    context["lending"]["reserveData"] = json!(BASE64_STANDARD.encode(vec![0u8; 298]));

    let err = build(
        json!({ "operation": "deposit", "params": { "amount": "1", "token": "USDC" } }),
        context,
    )
    .unwrap_err();
    assert_eq!(err.category(), "account_format");
}

#[test]
fn test_foreign_obligation_is_rejected() {
    let owner = Pubkey::new_unique();
    let (mut context, _) = lending_context(&owner, Token::Usdc, Some(&[]));
    context["lending"]["obligationData"] =
        json!(BASE64_STANDARD.encode(obligation_bytes(&Pubkey::new_unique(), &[])));

    let err = build(
        json!({ "operation": "deposit", "params": { "amount": "1", "token": "USDC" } }),
        context,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        TransactionBuilderError::InvalidContext { field: "obligation.owner", .. }
    ));
}

#[test]
fn test_token_transfer_with_long_memo() {
    let owner = Pubkey::new_unique();
    let context = json!({
        "owner": owner.to_string(),
        "blockhash": Hash::new_unique().to_string(),
        "lastValidBlockHeight": 1,
        "transfer": { "destinationAccountExists": false },
    });

    let output = build(
        json!({
            "operation": "transfer",
            "params": {
                "amount": "0.001",
                "token": "USDC",
                "recipient": Pubkey::new_unique().to_string(),
                "memo": "x".repeat(500),
            }
        }),
        context,
    )
    .unwrap();

    assert!(output.transaction.size <= 1232);
    assert_eq!(output.metadata.instructions[0], "create_recipient_account");
    assert_eq!(output.metadata.instructions.last(), Some(&"memo"));
}

#[test]
fn test_token_transfer_without_transfer_context_is_missing_context() {
    let owner = Pubkey::new_unique();
    let context = json!({
        "owner": owner.to_string(),
        "blockhash": Hash::new_unique().to_string(),
        "lastValidBlockHeight": 1,
    });

    let err = build(
        json!({
            "operation": "transfer",
            "params": {
                "amount": "5",
                "token": "USDC",
                "recipient": Pubkey::new_unique().to_string(),
            }
        }),
        context,
    )
    .unwrap_err();
    assert!(matches!(err, TransactionBuilderError::MissingContext(_)));
}

#[test]
fn test_withdraw_with_corrupt_deposit_count_is_rejected() {
    let owner = Pubkey::new_unique();
    let (mut context, _) = lending_context(&owner, Token::Usdc, Some(&[]));
    let mut data = obligation_bytes(&owner, &[Pubkey::new_unique()]);
    put(&mut data, 138, &11u16.to_le_bytes());
    context["lending"]["obligationData"] = json!(BASE64_STANDARD.encode(data));

    let err = build(
        json!({ "operation": "withdraw", "params": { "amount": "2", "token": "USDC" } }),
        context,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        TransactionBuilderError::MalformedAccount { record: "obligation", .. }
    ));
}

#[test]
fn test_unknown_operation_and_token() {
    let owner = Pubkey::new_unique();
    let (context, _) = lending_context(&owner, Token::Usdc, Some(&[]));

    let err = build(json!({ "operation": "liquidate", "params": {} }), context.clone()).unwrap_err();
    assert!(matches!(err, TransactionBuilderError::UnsupportedOperation(_)));

    let err = build(
        json!({ "operation": "deposit", "params": { "amount": "1", "token": "BONK" } }),
        context,
    )
    .unwrap_err();
    assert!(matches!(err, TransactionBuilderError::UnknownToken(_)));
}
