//! Streaming binary decoding and encoding driven by composable plans.
//!
//! codecstream turns irregularly chunked bit streams into typed values (and
//! back) without the caller ever managing partial reads. Describe the layout
//! once as a plan, then drive it from an iterator, a `Read`, or (with the
//! `async` feature) a `Stream` or `AsyncRead`.
//!
//! # Crate Structure
//!
//! - [`bits`]: immutable bit vectors and a bit builder
//! - [`codec`]: the single-value `Codec` capability and scalar codecs
//! - [`stream`]: decoder/encoder plans, sessions and pull adapters
//!
//! ```
//! use codecstream::codec::codecs::int32;
//! use codecstream::{from_chunks, many, BitVector, Codec};
//!
//! let wire = int32().encode(&1).unwrap().concat(&int32().encode(&2).unwrap());
//! let chunks: Vec<BitVector> = wire.chunks(3).collect();
//! let values: Vec<i32> = many(int32())
//!     .decode(from_chunks(chunks))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(values, vec![1, 2]);
//! ```

/// Re-export bit types.
pub mod bits {
    pub use codecstream_bits::*;
}

/// Re-export codec types.
pub mod codec {
    pub use codecstream_codec::*;
}

/// Re-export streaming types.
pub mod stream {
    pub use codecstream_stream::*;
}

pub use codecstream_bits::{BitBuffer, BitVector};
pub use codecstream_codec::{Codec, CodecError, CodecExt, DecodeResult};
pub use codecstream_stream::{
    from_chunks, many, once, try_many, DecodeIter, DecodeSession, EncodeIter, EncodeSession,
    EncodeWriter, IterSource, Progress, Pull, ReadSource, SessionConfig, StreamDecoder,
    StreamEncoder, StreamError,
};
