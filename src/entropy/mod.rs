//! Entropy coding models
//!
//! Frequency tables, the radix-`2^k` Huffman code builder, and the
//! Golomb–Rice cost model used to estimate pcdata sizes.

pub mod golomb_rice;
pub mod histogram;
pub mod huffman;

// Re-export main types
pub use golomb_rice::{golomb_rice_bits, GolombRice};
pub use histogram::FrequencyTable;
pub use huffman::{CodeTable, Codeword, HuffmanBuilder, HuffmanNode};

/// Bytes needed to hold `bits` bits
#[inline]
pub fn bits_to_bytes(bits: u64) -> u64 {
    (bits + 7) / 8
}
