//! Encoding schemes and table orderings compared by the harness

use crate::entropy::golomb_rice::MAX_BASE_BITS;
use crate::entropy::huffman::MAX_STREAM_ALIGN;
use crate::error::{Result, StackMapError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One way of laying out a program's stack maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncodingScheme {
    /// Every table stored in the expanded layout, raw pcdata
    Expanded,
    /// Every table stored in the compact layout, raw pcdata
    Compact,
    /// Byte-identical tables stored once, raw pcdata
    Deduplicated,
    /// Deduplicated tables, pcdata sized with Huffman codes over pc deltas and indices
    Huffman {
        /// Codeword digit width in bits
        stream_align: u32,
    },
    /// Deduplicated tables, indices sized with a Golomb–Rice code of base `2^n`
    GolombRice {
        /// Base exponent
        n: u32,
    },
    /// No tables; pc and bitmap deltas sized with Huffman codes
    DeltaHuffman {
        /// Codeword digit width in bits
        stream_align: u32,
    },
}

impl EncodingScheme {
    /// Whether the scheme stores each function's table
    pub fn uses_tables(&self) -> bool {
        !matches!(self, EncodingScheme::DeltaHuffman { .. })
    }

    /// Whether identical tables are stored once
    pub fn deduplicates(&self) -> bool {
        !matches!(
            self,
            EncodingScheme::Expanded | EncodingScheme::Compact | EncodingScheme::DeltaHuffman { .. }
        )
    }

    /// Whether the pcdata figure is a size estimate rather than real bytes
    pub fn is_estimate(&self) -> bool {
        matches!(
            self,
            EncodingScheme::Huffman { .. }
                | EncodingScheme::GolombRice { .. }
                | EncodingScheme::DeltaHuffman { .. }
        )
    }

    /// Check parameters are in range
    pub fn validate(&self) -> Result<()> {
        match *self {
            EncodingScheme::Huffman { stream_align }
            | EncodingScheme::DeltaHuffman { stream_align } => {
                if stream_align == 0 || stream_align > MAX_STREAM_ALIGN {
                    return Err(StackMapError::configuration(format!(
                        "{}: stream_align must be between 1 and {}",
                        self, MAX_STREAM_ALIGN
                    )));
                }
            }
            EncodingScheme::GolombRice { n } => {
                if n > MAX_BASE_BITS {
                    return Err(StackMapError::configuration(format!(
                        "{}: n must be at most {}",
                        self, MAX_BASE_BITS
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// The comparison set run when nothing else is configured
    pub fn default_set() -> Vec<EncodingScheme> {
        let mut schemes = vec![
            EncodingScheme::Deduplicated,
            EncodingScheme::Huffman { stream_align: 1 },
        ];
        schemes.extend((0..8).map(|n| EncodingScheme::GolombRice { n }));
        schemes.push(EncodingScheme::DeltaHuffman { stream_align: 1 });
        schemes.push(EncodingScheme::DeltaHuffman { stream_align: 8 });
        schemes
    }
}

impl fmt::Display for EncodingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingScheme::Expanded => f.write_str("expanded"),
            EncodingScheme::Compact => f.write_str("compact"),
            EncodingScheme::Deduplicated => f.write_str("dedup"),
            EncodingScheme::Huffman { stream_align } => write!(f, "huffman({})", stream_align),
            EncodingScheme::GolombRice { n } => write!(f, "golomb-rice({})", n),
            EncodingScheme::DeltaHuffman { stream_align } => {
                write!(f, "delta-huffman({})", stream_align)
            }
        }
    }
}

impl FromStr for EncodingScheme {
    type Err = StackMapError;

    /// Parses the [`Display`](fmt::Display) form; the parameter defaults to 1
    /// for Huffman variants and 0 for Golomb–Rice.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let (name, arg) = match s.find('(') {
            Some(open) if s.ends_with(')') => (&s[..open], Some(&s[open + 1..s.len() - 1])),
            Some(_) => {
                return Err(StackMapError::configuration(format!(
                    "unbalanced parentheses in scheme '{}'",
                    s
                )))
            }
            None => (s.as_str(), None),
        };
        let param = |default: u32| -> Result<u32> {
            match arg {
                None => Ok(default),
                Some(a) => a.trim().parse().map_err(|_| {
                    StackMapError::configuration(format!("bad parameter '{}' in scheme '{}'", a, s))
                }),
            }
        };

        let scheme = match name.trim() {
            "expanded" => EncodingScheme::Expanded,
            "compact" => EncodingScheme::Compact,
            "dedup" | "deduplicated" => EncodingScheme::Deduplicated,
            "huffman" => EncodingScheme::Huffman { stream_align: param(1)? },
            "golomb-rice" | "gr" => EncodingScheme::GolombRice { n: param(0)? },
            "delta-huffman" => EncodingScheme::DeltaHuffman { stream_align: param(1)? },
            other => {
                return Err(StackMapError::configuration(format!(
                    "unknown encoding scheme '{}'",
                    other
                )))
            }
        };
        let takes_param = !matches!(
            scheme,
            EncodingScheme::Expanded | EncodingScheme::Compact | EncodingScheme::Deduplicated
        );
        if arg.is_some() && !takes_param {
            return Err(StackMapError::configuration(format!(
                "scheme '{}' takes no parameter",
                name
            )));
        }
        scheme.validate()?;
        Ok(scheme)
    }
}

/// Order in which a function's bitmaps receive table indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitmapOrder {
    /// First occurrence in pc order
    #[default]
    Insertion,
    /// Most frequent bitmap first
    Frequency,
    /// Ascending bitmap value
    Value,
}

impl BitmapOrder {
    /// Short lowercase name
    pub fn name(self) -> &'static str {
        match self {
            BitmapOrder::Insertion => "insertion",
            BitmapOrder::Frequency => "frequency",
            BitmapOrder::Value => "value",
        }
    }
}

impl fmt::Display for BitmapOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BitmapOrder {
    type Err = StackMapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "insertion" => Ok(BitmapOrder::Insertion),
            "frequency" | "freq" => Ok(BitmapOrder::Frequency),
            "value" => Ok(BitmapOrder::Value),
            other => Err(StackMapError::configuration(format!(
                "unknown bitmap order '{}', expected insertion, frequency or value",
                other
            ))),
        }
    }
}
