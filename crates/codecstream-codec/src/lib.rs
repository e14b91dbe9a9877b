//! Single-value binary codecs.
//!
//! A [`Codec`] decodes one value from the front of a [`BitVector`] (returning
//! the unconsumed remainder) and encodes one value into a fresh region. It
//! reports failures as a [`CodecError`], which is either:
//! - `InsufficientInput`: more bits are needed than were supplied
//! - `Malformed`: enough bits were present but they do not form a value
//!
//! The streaming layer relies on that distinction to decide between pulling
//! more input, stopping cleanly, and failing.

pub mod codec;
pub mod codecs;
pub mod error;

pub use codec::{Codec, CodecExt, Contextual, DecodeResult, XMap};
pub use codecstream_bits::BitVector;
pub use error::{CodecError, ErrorPath, Result};
