//! Data output abstractions and implementations
//!
//! Little-endian writers for the table and pcdata encoders.

use crate::error::Result;
use crate::io::var_int::{zigzag, VarInt};
use crate::stackmap::Bitmap;

/// Trait for writing structured data to various destinations
pub trait DataOutput {
    /// Write a single byte
    fn write_u8(&mut self, value: u8) -> Result<()>;

    /// Write a 32-bit unsigned integer in little-endian format
    fn write_u32(&mut self, value: u32) -> Result<()>;

    /// Write an unsigned base-128 varint
    fn write_var_int(&mut self, value: u64) -> Result<()>;

    /// Write bytes from the provided buffer
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Write a signed value as an unsigned varint.
    ///
    /// Fails with `InvalidArgument` on negative input.
    fn write_var_int_checked(&mut self, value: i64) -> Result<()> {
        let mut scratch = Vec::with_capacity(VarInt::MAX_ENCODED_LEN);
        VarInt::write_checked(&mut scratch, value)?;
        self.write_bytes(&scratch)
    }

    /// Write a zigzag-mapped signed varint
    fn write_svar_int(&mut self, value: i64) -> Result<()> {
        self.write_var_int(zigzag(value))
    }

    /// Write the low `nbits` bits of `bitmap` as `ceil(nbits / 8)` little-endian bytes.
    ///
    /// Unused high bits of the last byte are written as zero.
    fn write_bitmap(&mut self, bitmap: &Bitmap, nbits: usize) -> Result<()> {
        let mut bytes = bitmap.to_le_bytes((nbits + 7) / 8);
        if nbits % 8 != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= (1u8 << (nbits % 8)) - 1;
            }
        }
        self.write_bytes(&bytes)
    }

    /// Get the total number of bytes written
    fn bytes_written(&self) -> u64;
}

/// DataOutput implementation for Vec<u8>
#[derive(Debug, Default)]
pub struct VecDataOutput {
    data: Vec<u8>,
}

impl VecDataOutput {
    /// Create a new VecDataOutput
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a new VecDataOutput with the specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Get the number of bytes written
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no bytes have been written
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a reference to the underlying data
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Convert into the underlying Vec<u8>
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl DataOutput for VecDataOutput {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.data.push(value);
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_var_int(&mut self, value: u64) -> Result<()> {
        VarInt::write_to_vec(&mut self.data, value);
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Create a DataOutput that writes to a Vec<u8>
pub fn to_vec() -> VecDataOutput {
    VecDataOutput::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::data_input::{DataInput, SliceDataInput};

    #[test]
    fn test_vec_data_output_basic() {
        let mut output = VecDataOutput::new();
        output.write_u8(0x42).unwrap();
        output.write_u32(0x1234_5678).unwrap();
        output.write_var_int(300).unwrap();

        assert_eq!(
            output.as_slice(),
            &[0x42, 0x78, 0x56, 0x34, 0x12, 0xAC, 0x02]
        );
        assert_eq!(output.bytes_written(), 7);
    }

    #[test]
    fn test_write_bitmap_width() {
        let mut output = to_vec();
        output.write_bitmap(&Bitmap::from(0b11u64), 2).unwrap();
        output.write_bitmap(&Bitmap::from(0x1FFu64), 9).unwrap();
        output.write_bitmap(&Bitmap::from(0xFFu64), 0).unwrap();
        assert_eq!(output.into_vec(), vec![0b11, 0xFF, 0x01]);
    }

    #[test]
    fn test_write_bitmap_zero_fills_unused_bits() {
        // Bits above the declared width never leak into the padding
        let mut output = to_vec();
        output.write_bitmap(&Bitmap::from(0xFFu64), 3).unwrap();
        assert_eq!(output.as_slice(), &[0b111]);
    }

    #[test]
    fn test_signed_and_checked() {
        let mut output = to_vec();
        for v in [0i64, -1, 1, -2] {
            output.write_svar_int(v).unwrap();
        }
        assert_eq!(output.as_slice(), &[0, 1, 2, 3]);

        assert!(output.write_var_int_checked(-5).is_err());
        assert_eq!(output.len(), 4);
        output.write_var_int_checked(5).unwrap();
        assert_eq!(output.len(), 5);
    }

    #[test]
    fn test_round_trip() {
        let mut output = to_vec();
        output.write_u32(7).unwrap();
        output.write_bitmap(&Bitmap::from_bits([0, 9, 17]), 18).unwrap();
        output.write_svar_int(-300).unwrap();

        let bytes = output.into_vec();
        let mut input = SliceDataInput::new(&bytes);
        assert_eq!(input.read_u32().unwrap(), 7);
        assert_eq!(input.read_bitmap(18).unwrap(), Bitmap::from_bits([0, 9, 17]));
        assert_eq!(input.read_svar_int().unwrap(), -300);
        assert_eq!(input.remaining(), 0);
    }
}
