//! Error types for the transaction builder
//!
//! Every failure the core can produce is a variant of
//! [`TransactionBuilderError`]. Errors carry the offending value and the limit
//! that was violated so callers can diagnose a rejected request without
//! re-running it. Nothing in the core is retried: the same inputs always
//! produce the same variant.

use thiserror::Error;

/// Error type for all transaction builder operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionBuilderError {
    /// Amount is negative, non-finite or not a number
    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount {
        /// The rejected input, as received
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Amount does not fit the u64 smallest-unit domain
    #[error("Amount {amount} exceeds maximum safe amount {max} for {decimals} decimals")]
    Overflow {
        /// The rejected amount
        amount: String,
        /// Largest amount accepted at these decimals
        max: String,
        /// Token decimals used for the conversion
        decimals: u8,
    },

    /// Token precision outside 0..=18
    #[error("Invalid decimals {0}: must be between 0 and 18")]
    InvalidDecimals(u8),

    /// Account buffer is missing or shorter than the record's minimum size
    #[error("Malformed {record} account: {reason}")]
    MalformedAccount {
        /// Record kind (reserve, lending_market, obligation)
        record: &'static str,
        /// Detailed reason
        reason: String,
    },

    /// A single field read would run past the end of the buffer
    #[error(
        "Buffer overflow reading field '{field}' at offset {offset} (length {length}): buffer is {buffer_len} bytes"
    )]
    BufferOverflow {
        /// Field being read
        field: &'static str,
        /// Field offset
        offset: usize,
        /// Field length
        length: usize,
        /// Actual buffer length
        buffer_len: usize,
    },

    /// Text could not be parsed as a 32-byte Base58 address
    #[error("Invalid address '{value}': {reason}")]
    InvalidAddress {
        /// The rejected text
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Program or seed derivation failed
    #[error("Address derivation failed: {0}")]
    AddressDerivation(String),

    /// Operation name is not one of the supported variants
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Token symbol or mint is not in the registry
    #[error("Unknown token: {0}")]
    UnknownToken(String),

    /// A required context field is absent
    #[error("Missing context: {0}")]
    MissingContext(String),

    /// A context field is present but inconsistent with the request
    #[error("Invalid context field '{field}': {reason}")]
    InvalidContext {
        /// Context field name
        field: &'static str,
        /// Detailed reason
        reason: String,
    },

    /// A request parameter is missing or malformed
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Detailed reason
        reason: String,
    },

    /// Failed to build an instruction for a specific program
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// The program the instruction targets
        program: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// Serialized transaction exceeds the packet ceiling
    #[error("Transaction too large: {size} bytes exceeds maximum of {max} bytes")]
    TransactionTooLarge {
        /// Serialized size
        size: usize,
        /// Ceiling
        max: usize,
    },

    /// Transaction would carry no instructions
    #[error("Transaction has 0 instructions: at least 1 is required (maximum {max})")]
    NoInstructions {
        /// Instruction ceiling
        max: usize,
    },

    /// Transaction would carry more instructions than allowed
    #[error("Transaction has {count} instructions: maximum is {max}")]
    TooManyInstructions {
        /// Offending count
        count: usize,
        /// Ceiling
        max: usize,
    },

    /// Message compilation or wire serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid builder configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TransactionBuilderError {
    /// Get the error category for logs and metrics labels
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. }
            | Self::Overflow { .. }
            | Self::InvalidDecimals(_)
            | Self::UnsupportedOperation(_)
            | Self::UnknownToken(_)
            | Self::InvalidParameter { .. } => "validation",
            Self::MissingContext(_) | Self::InvalidContext { .. } => "context",
            Self::MalformedAccount { .. } | Self::BufferOverflow { .. } => "account_format",
            Self::InvalidAddress { .. } | Self::AddressDerivation(_) => "address",
            Self::InstructionBuild { .. } => "instruction",
            Self::TransactionTooLarge { .. }
            | Self::NoInstructions { .. }
            | Self::TooManyInstructions { .. } => "limit",
            Self::Serialization(_) => "serialization",
            Self::Configuration(_) => "config",
        }
    }
}

// Convenience constructors for common error scenarios
impl TransactionBuilderError {
    /// Create an invalid amount error
    pub fn invalid_amount(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed account error for a record kind
    pub fn malformed(record: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedAccount {
            record,
            reason: reason.into(),
        }
    }

    /// Create an instruction build error for a specific program
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing context error
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingContext(what.into())
    }

    /// Create an invalid context error
    pub fn invalid_context(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidContext {
            field,
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_param(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
