//! Stack map data model and byte codecs
//!
//! - [`Bitmap`]: arbitrary-width live-slot bit vector
//! - [`BitmapTable`]: per-function deduplicated bitmap table with the
//!   expanded and compact byte layouts
//! - [`LivenessStream`]: pc-ordered liveness history with delta and filter
//!   transforms
//! - [`PcData`]: the pc-indexed delta/varint record stream
//! - [`Function`]: annotated instruction listing consumed from the parser

pub mod bitmap;
pub mod function;
pub mod liveness;
pub mod pcdata;
pub mod table;

pub use bitmap::Bitmap;
pub use function::{read_functions, Function, Instruction, Marker};
pub use liveness::{DeltaIter, LivePoint, LivenessDelta, LivenessStream};
pub use pcdata::{LivenessRecord, PcData, NO_MAP};
pub use table::{BitmapTable, TableLayout};
