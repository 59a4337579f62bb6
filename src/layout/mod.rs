//! Account layout parser
//!
//! Bounds-checked decoders for the fixed-offset account records of the
//! lending program. Parsers only extract keys and small integers; they never
//! interpret values.
//!
//! Failure policy:
//! - buffer missing, shorter than `MIN_SIZE`, or any single field out of
//!   bounds: fail loud
//! - obligation deposit list with a bad declared count: see
//!   [`obligation::ParsePolicy`]

pub mod market;
pub mod obligation;
pub mod reader;
pub mod reserve;

pub use market::ParsedMarket;
pub use obligation::{ObligationDeposit, ParsePolicy, ParsedObligation};
pub use reader::AccountReader;
pub use reserve::ParsedReserve;

use crate::tx_builder::errors::TransactionBuilderError;

/// Unwrap account data that the context collaborator may not have supplied
pub fn require_data<'a>(
    record: &'static str,
    data: Option<&'a [u8]>,
) -> Result<&'a [u8], TransactionBuilderError> {
    data.ok_or_else(|| TransactionBuilderError::malformed(record, "account data missing"))
}
