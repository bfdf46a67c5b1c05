//! Arbitrary-width liveness bitmaps
//!
//! A [`Bitmap`] is an unsigned integer of unbounded width read as a bit
//! vector: bit `i` set means slot `i` holds a live pointer. Bits are stored in
//! 64-bit little-endian blocks with trailing zero blocks trimmed, so two
//! bitmaps compare equal exactly when their bit patterns do, regardless of how
//! wide a table they were decoded from.

use std::cmp::Ordering;
use std::fmt;

const BITS_PER_BLOCK: usize = 64;

/// Unsigned integer treated as a bit vector
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bitmap {
    blocks: Vec<u64>,
}

impl Bitmap {
    /// The empty bitmap (no live slots)
    #[inline]
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Build a bitmap from the given set bit positions
    pub fn from_bits<I: IntoIterator<Item = usize>>(bits: I) -> Self {
        let mut bitmap = Self::new();
        for bit in bits {
            bitmap.set(bit);
        }
        bitmap
    }

    /// Decode a little-endian byte string (byte 0 holds bits 0..8)
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let mut blocks = Vec::with_capacity((bytes.len() + 7) / 8);
        for chunk in bytes.chunks(8) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            blocks.push(u64::from_le_bytes(word));
        }
        Self::from_blocks(blocks)
    }

    fn from_blocks(mut blocks: Vec<u64>) -> Self {
        while blocks.last() == Some(&0) {
            blocks.pop();
        }
        Self { blocks }
    }

    /// True if no bit is set
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of bits needed to represent the value (0 for the empty bitmap)
    pub fn bit_len(&self) -> usize {
        match self.blocks.last() {
            None => 0,
            Some(&top) => {
                (self.blocks.len() - 1) * BITS_PER_BLOCK
                    + (BITS_PER_BLOCK - top.leading_zeros() as usize)
            }
        }
    }

    /// Get the bit at `index`
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        let block = index / BITS_PER_BLOCK;
        match self.blocks.get(block) {
            Some(&word) => (word >> (index % BITS_PER_BLOCK)) & 1 == 1,
            None => false,
        }
    }

    /// Set the bit at `index`, growing as needed
    pub fn set(&mut self, index: usize) {
        let block = index / BITS_PER_BLOCK;
        if block >= self.blocks.len() {
            self.blocks.resize(block + 1, 0);
        }
        self.blocks[block] |= 1u64 << (index % BITS_PER_BLOCK);
    }

    /// Bitwise exclusive or
    pub fn xor(&self, other: &Bitmap) -> Bitmap {
        let len = self.blocks.len().max(other.blocks.len());
        let blocks = (0..len)
            .map(|i| self.block(i) ^ other.block(i))
            .collect();
        Self::from_blocks(blocks)
    }

    /// Bitwise or
    pub fn or(&self, other: &Bitmap) -> Bitmap {
        let len = self.blocks.len().max(other.blocks.len());
        let blocks = (0..len)
            .map(|i| self.block(i) | other.block(i))
            .collect();
        Self::from_blocks(blocks)
    }

    /// Bits set in `self` but not in `other` (`self & !other`)
    pub fn and_not(&self, other: &Bitmap) -> Bitmap {
        let blocks = (0..self.blocks.len())
            .map(|i| self.block(i) & !other.block(i))
            .collect();
        Self::from_blocks(blocks)
    }

    /// True if every bit of `self` is also set in `other`
    pub fn is_subset_of(&self, other: &Bitmap) -> bool {
        self.and_not(other).is_zero()
    }

    /// `(self << shift) | low`
    ///
    /// Used to grow codewords one radix digit at a time; `low` is expected to
    /// fit in `shift` bits but is or'ed in unconditionally.
    pub fn shl_or(&self, shift: usize, low: u64) -> Bitmap {
        let mut out = self.shl(shift);
        out.or_assign_shifted(&Bitmap::from(low), 0);
        out
    }

    /// Left shift by `shift` bits
    pub fn shl(&self, shift: usize) -> Bitmap {
        if self.is_zero() {
            return Bitmap::new();
        }
        let block_shift = shift / BITS_PER_BLOCK;
        let bit_shift = shift % BITS_PER_BLOCK;
        let mut blocks = vec![0u64; self.blocks.len() + block_shift + 1];
        for (i, &word) in self.blocks.iter().enumerate() {
            blocks[i + block_shift] |= word << bit_shift;
            if bit_shift != 0 {
                blocks[i + block_shift + 1] |= word >> (BITS_PER_BLOCK - bit_shift);
            }
        }
        Self::from_blocks(blocks)
    }

    /// Or `other << shift` into `self`
    pub fn or_assign_shifted(&mut self, other: &Bitmap, shift: usize) {
        let shifted = other.shl(shift);
        if shifted.blocks.len() > self.blocks.len() {
            self.blocks.resize(shifted.blocks.len(), 0);
        }
        for (dst, src) in self.blocks.iter_mut().zip(shifted.blocks.iter()) {
            *dst |= *src;
        }
    }

    /// Extract bits `[start, start + width)` as a new bitmap
    pub fn extract(&self, start: usize, width: usize) -> Bitmap {
        let mut out = Bitmap::new();
        for bit in 0..width {
            if self.get(start + bit) {
                out.set(bit);
            }
        }
        out
    }

    /// Little-endian bytes, exactly `nbytes` long.
    ///
    /// Bits at or above `nbytes * 8` are dropped.
    pub fn to_le_bytes(&self, nbytes: usize) -> Vec<u8> {
        (0..nbytes)
            .map(|i| (self.block(i / 8) >> ((i % 8) * 8)) as u8)
            .collect()
    }

    /// Value as `u64` if it fits
    pub fn to_u64(&self) -> Option<u64> {
        match self.blocks.len() {
            0 => Some(0),
            1 => Some(self.blocks[0]),
            _ => None,
        }
    }

    /// Value as `u128` if it fits
    pub fn to_u128(&self) -> Option<u128> {
        match self.blocks.len() {
            0 => Some(0),
            1 => Some(self.blocks[0] as u128),
            2 => Some(self.blocks[0] as u128 | (self.blocks[1] as u128) << 64),
            _ => None,
        }
    }

    #[inline]
    fn block(&self, i: usize) -> u64 {
        self.blocks.get(i).copied().unwrap_or(0)
    }
}

impl From<u64> for Bitmap {
    fn from(value: u64) -> Self {
        Self::from_blocks(vec![value])
    }
}

impl From<u128> for Bitmap {
    fn from(value: u128) -> Self {
        Self::from_blocks(vec![value as u64, (value >> 64) as u64])
    }
}

impl Ord for Bitmap {
    /// Numeric order of the underlying unsigned integers
    fn cmp(&self, other: &Self) -> Ordering {
        self.blocks
            .len()
            .cmp(&other.blocks.len())
            .then_with(|| self.blocks.iter().rev().cmp(other.blocks.iter().rev()))
    }
}

impl PartialOrd for Bitmap {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Binary for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0b")?;
        }
        if self.is_zero() {
            return f.write_str("0");
        }
        let s: String = (0..self.bit_len())
            .rev()
            .map(|bit| if self.get(bit) { '1' } else { '0' })
            .collect();
        f.write_str(&s)
    }
}

impl fmt::LowerHex for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        match self.blocks.split_last() {
            None => f.write_str("0"),
            Some((top, rest)) => {
                write!(f, "{:x}", top)?;
                for word in rest.iter().rev() {
                    write!(f, "{:016x}", word)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap({:#b})", self)
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self)
    }
}
