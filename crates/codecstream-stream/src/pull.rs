//! Synchronous chunk sources.

use std::convert::Infallible;
use std::error::Error;

use codecstream_bits::BitVector;

use crate::error::{Result, StreamError};

/// A blocking source of bit chunks.
///
/// `Ok(None)` means the source is finished; an empty chunk is not.
pub trait Pull {
    fn pull(&mut self) -> Result<Option<BitVector>>;

    /// Called when the consumer stops early. Sources holding external
    /// resources release them here; the adapter drops the source right after.
    fn cancel(&mut self) {}
}

impl<P: Pull + ?Sized> Pull for Box<P> {
    fn pull(&mut self) -> Result<Option<BitVector>> {
        (**self).pull()
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }
}

/// Pulls chunks from an iterator of results.
#[derive(Debug)]
pub struct IterSource<I> {
    iter: Option<I>,
}

impl<I> IterSource<I> {
    pub fn new(iter: I) -> Self {
        Self { iter: Some(iter) }
    }
}

impl<I, E> Pull for IterSource<I>
where
    I: Iterator<Item = std::result::Result<BitVector, E>>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    fn pull(&mut self) -> Result<Option<BitVector>> {
        let Some(iter) = self.iter.as_mut() else {
            return Ok(None);
        };
        match iter.next() {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(err)) => Err(StreamError::from_source(err)),
            None => {
                self.iter = None;
                Ok(None)
            }
        }
    }

    fn cancel(&mut self) {
        self.iter = None;
    }
}

pub type ChunkIter<I> =
    std::iter::Map<I, fn(BitVector) -> std::result::Result<BitVector, Infallible>>;

/// A source over chunks that are already in hand.
pub fn from_chunks<I>(chunks: I) -> IterSource<ChunkIter<I::IntoIter>>
where
    I: IntoIterator<Item = BitVector>,
{
    IterSource::new(
        chunks
            .into_iter()
            .map(Ok as fn(BitVector) -> std::result::Result<BitVector, Infallible>),
    )
}
