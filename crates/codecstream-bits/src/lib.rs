//! Immutable bit regions for incremental codecs.
//!
//! This is the lowest layer of codecstream. Every other crate reads and
//! writes values through the [`BitVector`] type provided here:
//! - Bits are ordered most-significant first within each byte
//! - Slicing (`take`, `drop`, `split_at`) never copies
//! - Concatenation copies only when the halves are not byte-aligned
//!
//! [`BitBuffer`] is the mutable builder used to assemble new regions.

pub mod buffer;
pub mod vector;

pub use buffer::BitBuffer;
pub use vector::BitVector;
