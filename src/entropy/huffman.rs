//! Generalized n-ary Huffman coding
//!
//! The builder merges `R = 2^stream_align` nodes at a time, so every
//! codeword is a whole number of `stream_align`-bit digits:
//! `stream_align = 1` gives the classic binary code, `stream_align = 8` a
//! byte-aligned one. Only code lengths and codewords are produced; nothing
//! here packs a bitstream.

use crate::entropy::FrequencyTable;
use crate::error::{Result, StackMapError};
use crate::stackmap::Bitmap;
use std::collections::btree_map::{self, BTreeMap};

/// Largest supported digit width in bits
pub const MAX_STREAM_ALIGN: u32 = 16;

/// Node in the prefix-code tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HuffmanNode<S> {
    /// A coded symbol
    Leaf(S),
    /// Children in digit order: child `i` extends the code with digit `i`
    Internal(Vec<HuffmanNode<S>>),
}

/// A codeword: the low `len` bits of `bits`, most significant digit first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codeword {
    /// Code value
    pub bits: Bitmap,
    /// Code length in bits
    pub len: usize,
}

impl Codeword {
    /// The empty code at the root
    pub fn empty() -> Self {
        Self {
            bits: Bitmap::new(),
            len: 0,
        }
    }

    /// Extend by one digit of `width` bits
    pub fn child(&self, digit: u64, width: usize) -> Self {
        Self {
            bits: self.bits.shl_or(width, digit),
            len: self.len + width,
        }
    }

    /// True if `self` is a (not necessarily proper) bit-prefix of `other`
    pub fn is_prefix_of(&self, other: &Codeword) -> bool {
        self.len <= other.len && other.bits.extract(other.len - self.len, self.len) == self.bits
    }
}

/// Mapping from symbol to codeword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable<S: Ord> {
    codes: BTreeMap<S, Codeword>,
    stream_align: u32,
}

impl<S: Ord> CodeTable<S> {
    /// Codeword for `symbol`
    pub fn get(&self, symbol: &S) -> Option<&Codeword> {
        self.codes.get(symbol)
    }

    /// Code length of `symbol` in bits
    pub fn code_len(&self, symbol: &S) -> Option<usize> {
        self.codes.get(symbol).map(|c| c.len)
    }

    /// Code length of `symbol`, failing if the symbol was not in the training alphabet
    pub fn require_len(&self, symbol: &S) -> Result<usize>
    where
        S: std::fmt::Debug,
    {
        self.code_len(symbol).ok_or_else(|| {
            StackMapError::invalid_argument(format!("symbol {:?} has no codeword", symbol))
        })
    }

    /// Number of coded symbols
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// True if no symbol is coded
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Digit width the table was built with
    pub fn stream_align(&self) -> u32 {
        self.stream_align
    }

    /// Longest code length
    pub fn max_code_len(&self) -> usize {
        self.codes.values().map(|c| c.len).max().unwrap_or(0)
    }

    /// `(symbol, codeword)` pairs in symbol order
    pub fn iter(&self) -> btree_map::Iter<'_, S, Codeword> {
        self.codes.iter()
    }

    /// Bits needed to code every occurrence counted in `frequencies`
    pub fn encoded_bits(&self, frequencies: &FrequencyTable<S>) -> Result<u64>
    where
        S: std::fmt::Debug,
    {
        let mut bits = 0u64;
        for (symbol, &count) in frequencies {
            bits += count * self.require_len(symbol)? as u64;
        }
        Ok(bits)
    }

    /// True if no codeword is a bit-prefix of another
    pub fn is_prefix_free(&self) -> bool {
        let codes: Vec<&Codeword> = self.codes.values().collect();
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                if a.is_prefix_of(b) || b.is_prefix_of(a) {
                    return false;
                }
            }
        }
        true
    }
}

/// Builder for radix-`2^stream_align` Huffman codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuffmanBuilder {
    stream_align: u32,
}

impl HuffmanBuilder {
    /// Builder with digits of `stream_align` bits (`1..=16`)
    pub fn new(stream_align: u32) -> Result<Self> {
        if stream_align == 0 || stream_align > MAX_STREAM_ALIGN {
            return Err(StackMapError::invalid_argument(format!(
                "stream_align must be between 1 and {}, got {}",
                MAX_STREAM_ALIGN, stream_align
            )));
        }
        Ok(Self { stream_align })
    }

    /// Classic binary code
    pub fn binary() -> Self {
        Self { stream_align: 1 }
    }

    /// Code with whole-byte codewords
    pub fn byte_aligned() -> Self {
        Self { stream_align: 8 }
    }

    /// Digit width in bits
    pub fn stream_align(&self) -> u32 {
        self.stream_align
    }

    /// Merge radix `2^stream_align`
    pub fn radix(&self) -> usize {
        1usize << self.stream_align
    }

    /// Build the code tree for `frequencies`.
    ///
    /// Nodes are kept sorted by descending weight; each round the `R`
    /// lightest nodes (the tail) become the children of one new node, which
    /// is reinserted after every node of equal or greater weight. When fewer
    /// than `R` nodes remain they are merged into the root in one step.
    /// Returns `None` for an empty alphabet.
    pub fn build_tree<S>(&self, frequencies: &FrequencyTable<S>) -> Option<HuffmanNode<S>>
    where
        S: Ord + Clone,
    {
        let radix = self.radix();
        let mut nodes: Vec<(u64, HuffmanNode<S>)> = frequencies
            .iter()
            .map(|(symbol, &count)| (count, HuffmanNode::Leaf(symbol.clone())))
            .collect();
        nodes.sort_by(|a, b| b.0.cmp(&a.0));

        while nodes.len() > 1 {
            let take = if nodes.len() < radix { nodes.len() } else { radix };
            let children = nodes.split_off(nodes.len() - take);
            let weight = children.iter().map(|(w, _)| *w).sum::<u64>();
            let node = HuffmanNode::Internal(children.into_iter().map(|(_, n)| n).collect());

            let at = nodes.partition_point(|(w, _)| *w >= weight);
            nodes.insert(at, (weight, node));
        }

        nodes.pop().map(|(_, root)| root)
    }

    /// Build a prefix code for `frequencies`.
    ///
    /// Fails with `DegenerateAlphabet` for fewer than two distinct symbols.
    pub fn build<S>(&self, frequencies: &FrequencyTable<S>) -> Result<CodeTable<S>>
    where
        S: Ord + Clone,
    {
        if frequencies.distinct() < 2 {
            return Err(StackMapError::degenerate_alphabet(frequencies.distinct()));
        }
        Ok(self.build_allow_degenerate(frequencies))
    }

    /// Like [`build`](Self::build), but a single symbol gets a zero-length
    /// code and an empty alphabet an empty table.
    ///
    /// A zero-length code carries no information, so a decoder for it would
    /// need the symbol count from elsewhere.
    pub fn build_allow_degenerate<S>(&self, frequencies: &FrequencyTable<S>) -> CodeTable<S>
    where
        S: Ord + Clone,
    {
        let mut codes = BTreeMap::new();
        if let Some(root) = self.build_tree(frequencies) {
            if frequencies.distinct() < 2 {
                log::warn!(
                    "building a zero-length code for a {}-symbol alphabet",
                    frequencies.distinct()
                );
            }
            Self::assign_codes(root, Codeword::empty(), self.stream_align as usize, &mut codes);
        }
        CodeTable {
            codes,
            stream_align: self.stream_align,
        }
    }

    fn assign_codes<S: Ord>(
        node: HuffmanNode<S>,
        code: Codeword,
        width: usize,
        codes: &mut BTreeMap<S, Codeword>,
    ) {
        match node {
            HuffmanNode::Leaf(symbol) => {
                codes.insert(symbol, code);
            }
            HuffmanNode::Internal(children) => {
                for (digit, child) in children.into_iter().enumerate() {
                    let child_code = code.child(digit as u64, width);
                    Self::assign_codes(child, child_code, width, codes);
                }
            }
        }
    }
}
