//! # stackmap-compress: measuring stack map encodings
//!
//! Encoders, decoders and size models for per-function pointer-liveness
//! metadata ("stack maps"). At selected program points a compiled function
//! records which stack slots hold live pointers as a bitmap; this crate
//! serializes a function's whole pc-to-bitmap history under competing
//! layouts and reports what each one costs.
//!
//! ## Key Features
//!
//! - **Byte Codec**: little-endian integers, padded bitmaps, LEB128 and
//!   zigzag varints over [`DataInput`] / [`DataOutput`]
//! - **Bitmap Tables**: per-function deduplicated tables in the expanded
//!   and compact layouts
//! - **PC-Indexed Codec**: delta/varint record streams with a symmetric decoder
//! - **Entropy Models**: radix-`2^k` Huffman codes and a Golomb–Rice cost model
//! - **Experiment Harness**: one function per [`EncodingScheme`], producing a
//!   [`SizeReport`]
//!
//! ## Quick Start
//!
//! ```rust
//! use stackmap_compress::{Bitmap, BitmapTable, LivenessRecord, PcData, TableLayout};
//!
//! let mut table = BitmapTable::new();
//! for bits in [0b01u64, 0b10, 0b11] {
//!     table.add(Bitmap::from(bits));
//! }
//! let bytes = table.encode(TableLayout::Expanded).unwrap();
//! assert_eq!(bytes.len(), 11);
//! assert_eq!(BitmapTable::decode(&bytes, TableLayout::Expanded).unwrap(), table);
//!
//! let pcdata = PcData::from_records(vec![LivenessRecord::new(0, 0), LivenessRecord::new(5, 1)]);
//! assert_eq!(pcdata.encode().unwrap(), vec![0, 0, 5, 2, 0]);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod entropy;
pub mod error;
pub mod experiment;
pub mod io;
pub mod stackmap;

// Re-export core types
pub use error::{Result, StackMapError};
pub use io::{DataInput, DataOutput, SliceDataInput, VarInt, VecDataOutput};
pub use stackmap::{
    Bitmap, BitmapTable, Function, Instruction, LivePoint, LivenessRecord, LivenessStream, Marker,
    PcData, TableLayout,
};

pub use config::{Config, ExperimentConfig};
pub use entropy::{CodeTable, FrequencyTable, GolombRice, HuffmanBuilder, HuffmanNode};
pub use experiment::{
    run_all, run_scheme, BitmapOrder, EncodingScheme, Experiment, FunctionLiveness,
    PreparedProgram, SchemeReport, SizeReport, TableArena, TableId,
};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library (currently only logs the version)
pub fn init() {
    log::debug!("Initializing stackmap-compress v{}", VERSION);
}
