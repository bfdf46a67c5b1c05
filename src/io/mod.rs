//! Byte-level codec primitives
//!
//! Little-endian fixed-width integers, padded bitmaps and base-128 varints
//! over in-memory buffers.

pub mod data_input;
pub mod data_output;
pub mod var_int;

// Re-export core types
pub use data_input::{DataInput, SliceDataInput};
pub use data_output::{DataOutput, VecDataOutput};
pub use var_int::{unzigzag, zigzag, VarInt};

// Convenience functions
pub use data_input::from_slice;
pub use data_output::to_vec;
