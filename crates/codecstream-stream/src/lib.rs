//! Incremental decoding and encoding of value streams.
//!
//! Plans ([`StreamDecoder`], [`StreamEncoder`]) describe how values map to a
//! bit stream. Sessions ([`DecodeSession`], [`EncodeSession`]) interpret a
//! plan over input fed to them piece by piece, never performing I/O
//! themselves. Adapters wrap a session in a pull loop:
//! - blocking: [`DecodeIter`], [`EncodeIter`], [`EncodeWriter`] over a
//!   [`Pull`] source or `std::io::Read`
//! - async (feature `async`): `DecodeStream`, `EncodeStream` and `PlanCodec`
//!
//! Decoding gives the same values however the input is chunked: a step that
//! runs out of bits waits for the next chunk, and only once input has ended
//! does a short tail count as the end of the stream (or as an error, for
//! nodes that must complete).

pub mod config;
pub mod decoder;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod iter;
pub mod pull;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod framed;
#[cfg(feature = "async")]
pub mod stream;

pub use config::{SessionConfig, DEFAULT_MAX_BUFFERED_BITS, DEFAULT_READ_CHUNK_SIZE};
pub use decoder::{many, once, try_many, Bind, Element, Step, StreamDecoder};
pub use driver::{DecodeOutcome, DecodeSession, EncodeSession, Progress};
pub use encoder::StreamEncoder;
pub use error::{Result, StreamError};
pub use iter::{DecodeIter, EncodeIter};
pub use pull::{from_chunks, IterSource, Pull};
pub use reader::ReadSource;
pub use writer::EncodeWriter;

#[cfg(feature = "async")]
pub use framed::PlanCodec;
#[cfg(feature = "async")]
pub use stream::{AsyncPull, DecodeStream, EncodeStream, ReaderSource, StreamSource};
