//! Per-function bitmap tables
//!
//! A [`BitmapTable`] holds the distinct liveness bitmaps of one function in
//! order of first occurrence, together with the common bit width every entry
//! is encoded at. Two byte layouts exist:
//!
//! - **Expanded**: `u32 count`, `u32 width`, then each bitmap padded to
//!   `ceil(width / 8)` bytes. `8 + N * ceil(W / 8)` bytes in total.
//! - **Compact**: `u32 count`, `u8 width`, then all bitmaps packed into one
//!   `N * W`-bit field, entry `i` at bits `[i * W, (i + 1) * W)`.
//!   `5 + ceil(N * W / 8)` bytes in total.

use crate::error::{check_remaining, Result, StackMapError};
use crate::io::{DataInput, DataOutput, SliceDataInput, VecDataOutput};
use crate::stackmap::Bitmap;
use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Byte layout of an encoded [`BitmapTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableLayout {
    /// Every bitmap padded to whole bytes, 32-bit width field
    #[default]
    Expanded,
    /// All bitmaps packed into one bit field, 8-bit width field
    Compact,
}

impl TableLayout {
    /// Short lowercase name
    pub fn name(self) -> &'static str {
        match self {
            TableLayout::Expanded => "expanded",
            TableLayout::Compact => "compact",
        }
    }

    /// Encoded size of a table with `count` entries of `width` bits
    pub fn encoded_len(self, count: usize, width: usize) -> usize {
        match self {
            TableLayout::Expanded => 8 + count * ((width + 7) / 8),
            TableLayout::Compact => 5 + (count * width + 7) / 8,
        }
    }
}

impl fmt::Display for TableLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for TableLayout {
    type Err = StackMapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "expanded" => Ok(TableLayout::Expanded),
            "compact" => Ok(TableLayout::Compact),
            other => Err(StackMapError::configuration(format!(
                "unknown table layout '{}', expected 'expanded' or 'compact'",
                other
            ))),
        }
    }
}

/// Ordered, deduplicated collection of fixed-width bitmaps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitmapTable {
    bitmaps: Vec<Bitmap>,
    nbit: usize,
}

impl BitmapTable {
    /// Create an empty table of width 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.bitmaps.len()
    }

    /// True if the table has no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitmaps.is_empty()
    }

    /// Common bit width of all entries
    #[inline]
    pub fn width(&self) -> usize {
        self.nbit
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&Bitmap> {
        self.bitmaps.get(index)
    }

    /// All entries in index order
    pub fn bitmaps(&self) -> &[Bitmap] {
        &self.bitmaps
    }

    /// Index of `bitmap` if present
    pub fn position(&self, bitmap: &Bitmap) -> Option<usize> {
        // Tables hold tens of entries; a linear scan beats hashing here.
        self.bitmaps.iter().position(|b| b == bitmap)
    }

    /// Add `bitmap`, returning the index of its (possibly pre-existing) entry.
    ///
    /// The width grows to cover the new value even when the bitmap is
    /// already present; it never shrinks.
    pub fn add(&mut self, bitmap: Bitmap) -> usize {
        self.nbit = self.nbit.max(bitmap.bit_len());
        if let Some(index) = self.position(&bitmap) {
            return index;
        }
        self.bitmaps.push(bitmap);
        self.bitmaps.len() - 1
    }

    /// Reorder entries by ascending value.
    ///
    /// Returns `remap` with `remap[old_index] == new_index`.
    pub fn sort(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.bitmaps.len()).collect();
        order.sort_by(|&a, &b| self.bitmaps[a].cmp(&self.bitmaps[b]));

        let mut remap = vec![0usize; order.len()];
        for (new_index, &old_index) in order.iter().enumerate() {
            remap[old_index] = new_index;
        }

        let old = std::mem::take(&mut self.bitmaps);
        let mut slots: Vec<Option<Bitmap>> = old.into_iter().map(Some).collect();
        self.bitmaps = order
            .iter()
            .filter_map(|&old_index| slots[old_index].take())
            .collect();
        remap
    }

    /// Encoded size under `layout`
    pub fn encoded_len(&self, layout: TableLayout) -> usize {
        layout.encoded_len(self.len(), self.nbit)
    }

    /// Write the table to `out` under `layout`
    pub fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O, layout: TableLayout) -> Result<()> {
        let count = u32::try_from(self.bitmaps.len()).map_err(|_| {
            StackMapError::invalid_argument(format!(
                "table of {} entries exceeds the 32-bit count field",
                self.bitmaps.len()
            ))
        })?;
        out.write_u32(count)?;

        match layout {
            TableLayout::Expanded => {
                let width = u32::try_from(self.nbit).map_err(|_| {
                    StackMapError::invalid_argument(format!(
                        "bitmap width {} exceeds the 32-bit width field",
                        self.nbit
                    ))
                })?;
                out.write_u32(width)?;
                for bitmap in &self.bitmaps {
                    out.write_bitmap(bitmap, self.nbit)?;
                }
            }
            TableLayout::Compact => {
                let width = u8::try_from(self.nbit).map_err(|_| {
                    StackMapError::invalid_argument(format!(
                        "bitmap width {} does not fit the compact 8-bit width field",
                        self.nbit
                    ))
                })?;
                out.write_u8(width)?;
                let mut combined = Bitmap::new();
                for (i, bitmap) in self.bitmaps.iter().enumerate() {
                    combined.or_assign_shifted(bitmap, i * self.nbit);
                }
                out.write_bitmap(&combined, self.bitmaps.len() * self.nbit)?;
            }
        }
        Ok(())
    }

    /// Encode the table under `layout`
    pub fn encode(&self, layout: TableLayout) -> Result<Vec<u8>> {
        let mut out = VecDataOutput::with_capacity(self.encoded_len(layout));
        self.write_to(&mut out, layout)?;
        Ok(out.into_vec())
    }

    /// Read one table from `input`, leaving any following bytes unread
    pub fn read_from<I: DataInput + ?Sized>(input: &mut I, layout: TableLayout) -> Result<Self> {
        let count = input.read_u32()? as usize;
        let nbit = match layout {
            TableLayout::Expanded => input.read_u32()? as usize,
            TableLayout::Compact => input.read_u8()? as usize,
        };

        // Reject impossible headers before allocating for them. Entries are
        // distinct, so a width of `nbit` bits holds at most `2^nbit` of them.
        if nbit < usize::BITS as usize && count > 1usize << nbit {
            return Err(StackMapError::malformed(format!(
                "{} distinct entries cannot fit a width of {} bit(s)",
                count, nbit
            )));
        }
        let body = layout.encoded_len(count, nbit) - layout.encoded_len(0, 0);
        check_remaining(0, body, input.remaining())?;

        let bitmaps = match layout {
            TableLayout::Expanded => {
                let mut bitmaps = Vec::with_capacity(count);
                for _ in 0..count {
                    bitmaps.push(input.read_bitmap(nbit)?);
                }
                bitmaps
            }
            TableLayout::Compact => {
                let combined = input.read_bitmap(count * nbit)?;
                (0..count).map(|i| combined.extract(i * nbit, nbit)).collect()
            }
        };

        if let Some(index) = first_duplicate(&bitmaps) {
            return Err(StackMapError::malformed(format!(
                "table entry {} duplicates an earlier entry",
                index
            )));
        }

        Ok(Self { bitmaps, nbit })
    }

    /// Decode a table that occupies all of `data`
    pub fn decode(data: &[u8], layout: TableLayout) -> Result<Self> {
        let mut input = SliceDataInput::new(data);
        let table = Self::read_from(&mut input, layout)?;
        if input.has_more() {
            return Err(StackMapError::malformed(format!(
                "{} trailing byte(s) after {} table",
                input.remaining(),
                layout
            )));
        }
        Ok(table)
    }

    /// Copy the table through a full encode/decode cycle
    pub fn clone_via_codec(&self) -> Result<Self> {
        Self::decode(&self.encode(TableLayout::Expanded)?, TableLayout::Expanded)
    }
}

/// Index of the first entry equal to an earlier one
fn first_duplicate(bitmaps: &[Bitmap]) -> Option<usize> {
    let mut seen: HashSet<&Bitmap, RandomState> =
        HashSet::with_capacity_and_hasher(bitmaps.len(), RandomState::new());
    bitmaps.iter().position(|b| !seen.insert(b))
}
