//! Bounds-checked field reader over a raw account buffer

use solana_sdk::pubkey::Pubkey;

use crate::tx_builder::errors::TransactionBuilderError;

pub const PUBKEY_LEN: usize = 32;

/// Reads fixed-offset fields from account data
///
/// Construction checks the buffer against the record's declared minimum
/// size; every read then checks its own `(offset, length)` again, so a
/// minimum size that undershoots a field's extent still fails loudly.
#[derive(Debug, Clone, Copy)]
pub struct AccountReader<'a> {
    record: &'static str,
    data: &'a [u8],
}

impl<'a> AccountReader<'a> {
    pub fn new(
        record: &'static str,
        data: &'a [u8],
        min_size: usize,
    ) -> Result<Self, TransactionBuilderError> {
        if data.len() < min_size {
            return Err(TransactionBuilderError::malformed(
                record,
                format!(
                    "buffer is {} bytes, minimum size is {} bytes",
                    data.len(),
                    min_size
                ),
            ));
        }
        Ok(Self { record, data })
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `length` bytes at `offset`
    pub fn bytes(
        &self,
        field: &'static str,
        offset: usize,
        length: usize,
    ) -> Result<&'a [u8], TransactionBuilderError> {
        let end = offset.checked_add(length);
        match end {
            Some(end) if end <= self.data.len() => Ok(&self.data[offset..end]),
            _ => Err(TransactionBuilderError::BufferOverflow {
                field,
                offset,
                length,
                buffer_len: self.data.len(),
            }),
        }
    }

    fn array<const N: usize>(
        &self,
        field: &'static str,
        offset: usize,
    ) -> Result<[u8; N], TransactionBuilderError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(field, offset, N)?);
        Ok(out)
    }

    pub fn u8(&self, field: &'static str, offset: usize) -> Result<u8, TransactionBuilderError> {
        Ok(self.bytes(field, offset, 1)?[0])
    }

    pub fn u16_le(&self, field: &'static str, offset: usize) -> Result<u16, TransactionBuilderError> {
        self.array(field, offset).map(u16::from_le_bytes)
    }

    pub fn u64_le(&self, field: &'static str, offset: usize) -> Result<u64, TransactionBuilderError> {
        self.array(field, offset).map(u64::from_le_bytes)
    }

    pub fn u128_le(
        &self,
        field: &'static str,
        offset: usize,
    ) -> Result<u128, TransactionBuilderError> {
        self.array(field, offset).map(u128::from_le_bytes)
    }

    pub fn pubkey(
        &self,
        field: &'static str,
        offset: usize,
    ) -> Result<Pubkey, TransactionBuilderError> {
        self.array::<PUBKEY_LEN>(field, offset).map(Pubkey::new_from_array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_buffer_below_min_size() {
        let data = [0u8; 9];
        let err = AccountReader::new("reserve", &data, 10).unwrap_err();
        assert!(matches!(
            err,
            TransactionBuilderError::MalformedAccount { record: "reserve", .. }
        ));
    }

    #[test]
    fn test_reads_little_endian_fields() {
        let mut data = vec![0u8; 64];
        data[0] = 7;
        data[1..3].copy_from_slice(&513u16.to_le_bytes());
        data[3..11].copy_from_slice(&1_000_000u64.to_le_bytes());
        data[11..27].copy_from_slice(&(u64::MAX as u128 + 5).to_le_bytes());
        data[27..59].copy_from_slice(&[9u8; 32]);

        let reader = AccountReader::new("test", &data, 64).unwrap();
        assert_eq!(reader.u8("a", 0).unwrap(), 7);
        assert_eq!(reader.u16_le("b", 1).unwrap(), 513);
        assert_eq!(reader.u64_le("c", 3).unwrap(), 1_000_000);
        assert_eq!(reader.u128_le("d", 11).unwrap(), u64::MAX as u128 + 5);
        assert_eq!(reader.pubkey("e", 27).unwrap(), Pubkey::new_from_array([9u8; 32]));
    }

    #[test]
    fn test_field_read_past_end_fails_even_when_min_size_undershoots() {
        let data = [0u8; 40];
        // minimum size accepted, field extends beyond the buffer
        let reader = AccountReader::new("market", &data, 10).unwrap();
        let err = reader.pubkey("owner", 20).unwrap_err();
        assert_eq!(
            err,
            TransactionBuilderError::BufferOverflow {
                field: "owner",
                offset: 20,
                length: 32,
                buffer_len: 40,
            }
        );
    }

    #[test]
    fn test_offset_overflow_does_not_wrap() {
        let data = [0u8; 8];
        let reader = AccountReader::new("test", &data, 0).unwrap();
        assert!(reader.bytes("huge", usize::MAX, 2).is_err());
    }
}
