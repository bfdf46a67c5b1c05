//! Golomb–Rice size model
//!
//! A Golomb–Rice code with base `2^n` writes `val >> n` as a unary run, one
//! terminator bit, then the low `n` bits verbatim. Only the bit cost is
//! modelled here; there is no encoder or decoder behind it.

use crate::error::{Result, StackMapError};

/// Largest base exponent accepted by [`GolombRice::new`]
pub const MAX_BASE_BITS: u32 = 63;

/// Bits used by the Golomb–Rice code of `val` in base `2^n`: `1 + (val >> n) + n`
#[inline]
pub fn golomb_rice_bits(val: u64, n: u32) -> u64 {
    1 + val.checked_shr(n).unwrap_or(0) + n as u64
}

/// Golomb–Rice cost model with a fixed base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GolombRice {
    n: u32,
}

impl GolombRice {
    /// Model with base `2^n`, `n <= 63`
    pub fn new(n: u32) -> Result<Self> {
        if n > MAX_BASE_BITS {
            return Err(StackMapError::invalid_argument(format!(
                "Golomb-Rice base exponent must be at most {}, got {}",
                MAX_BASE_BITS, n
            )));
        }
        Ok(Self { n })
    }

    /// Base exponent
    pub fn base_bits(&self) -> u32 {
        self.n
    }

    /// Cost of one value in bits
    #[inline]
    pub fn cost(&self, val: u64) -> u64 {
        golomb_rice_bits(val, self.n)
    }

    /// Cost of a signed value that may be the `-1` sentinel.
    ///
    /// Values are shifted up by one so the sentinel codes as 0.
    pub fn cost_offset(&self, val: i64) -> Result<u64> {
        let shifted = val.checked_add(1).filter(|v| *v >= 0).ok_or_else(|| {
            StackMapError::invalid_argument(format!(
                "value {} is below the -1 sentinel and cannot be Golomb-Rice coded",
                val
            ))
        })?;
        Ok(self.cost(shifted as u64))
    }
}
