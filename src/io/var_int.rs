//! Variable-length integer encoding
//!
//! Base-128 varints: each byte carries seven value bits, least significant
//! group first, with the high bit set on every byte except the last. Signed
//! values go through the zigzag mapping first so that small negative deltas
//! stay short.

use crate::error::{Result, StackMapError};
use crate::io::data_input::DataInput;

/// Utility struct for variable-length integer encoding/decoding
pub struct VarInt;

impl VarInt {
    /// Maximum number of bytes needed to encode a u64 as a varint
    pub const MAX_ENCODED_LEN: usize = 10;

    /// Append `value` to `buffer`, returning the number of bytes written
    pub fn write_to_vec(buffer: &mut Vec<u8>, mut value: u64) -> usize {
        let mut bytes_written = 0;

        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;

            if value != 0 {
                byte |= 0x80; // Set continuation bit
            }

            buffer.push(byte);
            bytes_written += 1;

            if value == 0 {
                break;
            }
        }

        bytes_written
    }

    /// Append a value that arrived as a signed quantity.
    ///
    /// Unsigned varints are only defined for non-negative magnitudes, so a
    /// negative `value` is rejected instead of being reinterpreted.
    pub fn write_checked(buffer: &mut Vec<u8>, value: i64) -> Result<usize> {
        if value < 0 {
            return Err(StackMapError::invalid_argument(format!(
                "negative value {} passed to unsigned varint encoder",
                value
            )));
        }
        Ok(Self::write_to_vec(buffer, value as u64))
    }

    /// Encode a u64 value as a variable-length integer and return the bytes
    pub fn encode(value: u64) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::MAX_ENCODED_LEN);
        Self::write_to_vec(&mut buffer, value);
        buffer
    }

    /// Read a variable-length integer from a DataInput implementation
    pub fn read_from<R: DataInput + ?Sized>(reader: &mut R) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;

        for _ in 0..Self::MAX_ENCODED_LEN {
            let byte = reader.read_u8()?;

            if shift == 63 && (byte & 0x7F) > 1 {
                return Err(StackMapError::malformed("varint overflows 64 bits"));
            }

            result |= ((byte & 0x7F) as u64) << shift;

            // If continuation bit is not set, we're done
            if (byte & 0x80) == 0 {
                return Ok(result);
            }

            shift += 7;
        }

        Err(StackMapError::malformed("varint too long"))
    }

    /// Decode a variable-length integer from a byte slice
    ///
    /// # Returns
    /// * `Ok((value, bytes_consumed))` - The decoded value and number of bytes consumed
    pub fn decode(data: &[u8]) -> Result<(u64, usize)> {
        let mut input = crate::io::data_input::SliceDataInput::new(data);
        let value = Self::read_from(&mut input)?;
        Ok((value, input.pos()))
    }

    /// Calculate the number of bytes needed to encode a value
    pub fn encoded_len(mut value: u64) -> usize {
        if value == 0 {
            return 1;
        }

        let mut len = 0;
        while value > 0 {
            len += 1;
            value >>= 7;
        }
        len
    }
}

/// Map a signed integer onto the unsigned integers, small magnitudes first.
///
/// `0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, ...`
#[inline]
pub fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag`]
#[inline]
pub fn unzigzag(encoded: u64) -> i64 {
    ((encoded >> 1) as i64) ^ (-((encoded & 1) as i64))
}
