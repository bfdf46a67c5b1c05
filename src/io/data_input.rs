//! Data input abstractions and implementations
//!
//! Bounds-checked little-endian readers. Every read that would run past the
//! end of the buffer fails with
//! [`MalformedInput`](crate::StackMapError::MalformedInput) and leaves the
//! position unchanged.

use crate::error::{check_remaining, Result};
use crate::io::var_int::{unzigzag, VarInt};
use crate::stackmap::Bitmap;

/// Trait for reading structured data from various sources
pub trait DataInput {
    /// Read a single byte
    fn read_u8(&mut self) -> Result<u8>;

    /// Read a 32-bit unsigned integer in little-endian format
    fn read_u32(&mut self) -> Result<u32>;

    /// Read exact number of bytes into the provided buffer
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Read an unsigned base-128 varint
    fn read_var_int(&mut self) -> Result<u64> {
        VarInt::read_from(self)
    }

    /// Read a zigzag-mapped signed varint
    fn read_svar_int(&mut self) -> Result<i64> {
        Ok(unzigzag(self.read_var_int()?))
    }

    /// Read a `nbits`-wide bitmap stored in `ceil(nbits / 8)` little-endian bytes.
    ///
    /// Bits of the last byte at or above `nbits` are ignored.
    fn read_bitmap(&mut self, nbits: usize) -> Result<Bitmap> {
        let mut buf = vec![0u8; (nbits + 7) / 8];
        self.read_bytes(&mut buf)?;
        if nbits % 8 != 0 {
            if let Some(last) = buf.last_mut() {
                *last &= (1u8 << (nbits % 8)) - 1;
            }
        }
        Ok(Bitmap::from_le_bytes(&buf))
    }

    /// Number of unread bytes
    fn remaining(&self) -> usize;
}

/// DataInput implementation for byte slices
pub struct SliceDataInput<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SliceDataInput<'a> {
    /// Create a new SliceDataInput from a byte slice
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Get the current position
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Check if there are more bytes to read
    pub fn has_more(&self) -> bool {
        self.position < self.data.len()
    }
}

impl<'a> DataInput for SliceDataInput<'a> {
    fn read_u8(&mut self) -> Result<u8> {
        check_remaining(self.position, 1, self.data.len())?;
        let value = self.data[self.position];
        self.position += 1;
        Ok(value)
    }

    fn read_u32(&mut self) -> Result<u32> {
        check_remaining(self.position, 4, self.data.len())?;
        let bytes = &self.data[self.position..self.position + 4];
        self.position += 4;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        check_remaining(self.position, buf.len(), self.data.len())?;
        buf.copy_from_slice(&self.data[self.position..self.position + buf.len()]);
        self.position += buf.len();
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }
}

/// Create a DataInput from a byte slice
pub fn from_slice(data: &[u8]) -> SliceDataInput<'_> {
    SliceDataInput::new(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_data_input_basic() {
        let data = [0x42, 0x78, 0x56, 0x34, 0x12, 0xAC, 0x02];
        let mut input = SliceDataInput::new(&data);

        assert_eq!(input.read_u8().unwrap(), 0x42);
        assert_eq!(input.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(input.read_var_int().unwrap(), 300);
        assert_eq!(input.remaining(), 0);
        assert!(!input.has_more());
    }

    #[test]
    fn test_read_past_end() {
        let data = [1, 2, 3];
        let mut input = SliceDataInput::new(&data);
        let err = input.read_u32().unwrap_err();
        assert_eq!(err.category(), "malformed");
        // Position untouched by the failed read
        assert_eq!(input.pos(), 0);
        assert_eq!(input.read_u8().unwrap(), 1);
        let mut rest = [0u8; 3];
        assert!(input.read_bytes(&mut rest).is_err());
        assert_eq!(input.remaining(), 2);
        let mut rest = [0u8; 2];
        input.read_bytes(&mut rest).unwrap();
        assert_eq!(rest, [2, 3]);
        assert!(input.read_u8().is_err());
    }

    #[test]
    fn test_read_bitmap_ignores_padding_bits() {
        // 3-bit bitmap with junk in the unused high bits
        let data = [0b1111_1101u8];
        let mut input = SliceDataInput::new(&data);
        assert_eq!(input.read_bitmap(3).unwrap(), Bitmap::from(0b101u64));

        let data = [0xFF, 0x01, 0xAA];
        let mut input = SliceDataInput::new(&data);
        assert_eq!(input.read_bitmap(9).unwrap(), Bitmap::from(0x1FFu64));
        assert_eq!(input.remaining(), 1);
        assert_eq!(input.read_u8().unwrap(), 0xAA);
    }

    #[test]
    fn test_read_zero_width_bitmap() {
        let mut input = SliceDataInput::new(&[]);
        assert_eq!(input.read_bitmap(0).unwrap(), Bitmap::new());
    }

    #[test]
    fn test_read_signed() {
        let data = [0x00, 0x01, 0x02, 0x03];
        let mut input = from_slice(&data);
        let values: Vec<i64> = (0..4).map(|_| input.read_svar_int().unwrap()).collect();
        assert_eq!(values, vec![0, -1, 1, -2]);
    }
}
