//! Attested transaction builder
//!
//! Deterministic construction of unsigned Solana transactions for lending
//! deposits and withdrawals, pre-quoted swaps and transfers. The caller
//! supplies every on-chain fact up front; this crate only encodes, derives
//! and validates.

pub mod address;
pub mod amount;
pub mod compat;
pub mod config;
pub mod layout;
pub mod registry;
pub mod structured_logging;
pub mod tx_builder;

// Re-export commonly used types
pub use config::BuilderConfig;
pub use registry::Token;
pub use tx_builder::{build_transaction, BuildOutput, OperationRequest, TransactionBuilderError};
pub use solana_sdk::{message::VersionedMessage, pubkey::Pubkey};
