//! Unsigned transaction builder
//!
//! Turns an operation request plus an already-prepared context into a
//! serialized unsigned transaction. No network access, no keys, no state
//! between calls.
//!
//! ## Architecture
//!
//! - **errors**: single error taxonomy with categories for logs
//! - **context**: typed and plain-data forms of the prepared context
//! - **instructions**: lending, transfer and swap instruction planning
//! - **assembler**: message compilation, size and count validation
//! - **output**: wire transaction, metadata and advisories
//! - **builder**: request dispatch tying the above together
//!
//! ## Ordering
//!
//! Compute budget instructions (if configured) come first, then the
//! operation's setup instructions, then the operation itself, then any
//! cleanup or memo. The assembler never reorders.

pub mod errors;
pub use errors::TransactionBuilderError;

pub mod assembler;
pub mod builder;
pub mod context;
pub mod instructions;
pub mod output;

pub use assembler::{assemble, validate_instruction_count, validate_transaction_size};
pub use builder::{build_transaction, OperationParams, OperationRequest, TransactionBuilder};
pub use context::{Lifetime, PreparedContext, PreparedContextDto};
pub use instructions::{InstructionPlan, Operation};
pub use output::{Advisory, AdvisoryKind, BuildOutput, OperationMetadata, WireTransaction};
