//! Blocking adapters: plans driven by a [`Pull`] source or an iterator of
//! values, exposed as std iterators.

use std::io::Read;
use std::iter::FusedIterator;

use codecstream_bits::{BitBuffer, BitVector};
use tracing::debug;

use crate::config::SessionConfig;
use crate::decoder::{Element, StreamDecoder};
use crate::driver::{DecodeSession, EncodeSession, Progress};
use crate::encoder::StreamEncoder;
use crate::error::Result;
use crate::pull::Pull;
use crate::reader::ReadSource;

/// Lazily decoded values, pulling chunks only when the plan needs them.
///
/// Yields `Ok` values until the plan completes, or until one `Err` after
/// which the iterator is exhausted. The source is cancelled and dropped as
/// soon as it is no longer needed.
pub struct DecodeIter<T, P: Pull> {
    session: DecodeSession<T>,
    source: Option<P>,
}

impl<T: Element, P: Pull> DecodeIter<T, P> {
    pub fn new(plan: StreamDecoder<T>, source: P) -> Self {
        Self::with_config(plan, source, SessionConfig::default())
    }

    pub fn with_config(plan: StreamDecoder<T>, source: P, config: SessionConfig) -> Self {
        Self {
            session: DecodeSession::with_config(plan, config),
            source: Some(source),
        }
    }

    /// Stop decoding and release the source.
    pub fn cancel(&mut self) {
        self.session.abort();
        self.release();
    }

    /// Whether the source is still held.
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            debug!("releasing decode source");
            source.cancel();
        }
    }
}

impl<T: Element, P: Pull> Iterator for DecodeIter<T, P> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.session.step() {
                Ok(Progress::Ready(value)) => return Some(Ok(value)),
                Ok(Progress::Done) => {
                    self.release();
                    return None;
                }
                Ok(Progress::NeedInput) => {
                    let Some(source) = self.source.as_mut() else {
                        self.session.end_of_input();
                        continue;
                    };
                    match source.pull() {
                        Ok(Some(chunk)) => self.session.push_chunk(chunk),
                        Ok(None) => {
                            self.session.end_of_input();
                            self.source = None;
                        }
                        Err(err) => {
                            self.cancel();
                            return Some(Err(err));
                        }
                    }
                }
                Err(err) => {
                    self.release();
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<T: Element, P: Pull> FusedIterator for DecodeIter<T, P> {}

impl<T: Element> StreamDecoder<T> {
    /// Decode values lazily from `source`.
    pub fn decode<P: Pull>(&self, source: P) -> DecodeIter<T, P> {
        DecodeIter::new(self.clone(), source)
    }

    pub fn decode_with_config<P: Pull>(
        &self,
        source: P,
        config: SessionConfig,
    ) -> DecodeIter<T, P> {
        DecodeIter::with_config(self.clone(), source, config)
    }

    /// Decode values lazily from a byte reader.
    pub fn decode_reader<R: Read>(
        &self,
        reader: R,
        config: SessionConfig,
    ) -> DecodeIter<T, ReadSource<R>> {
        DecodeIter::with_config(self.clone(), ReadSource::with_config(reader, &config), config)
    }
}

/// Lazily encoded chunks, taking values from `input` only when the plan asks.
pub struct EncodeIter<T, I> {
    session: EncodeSession<T>,
    input: Option<I>,
}

impl<T, I: Iterator<Item = T>> EncodeIter<T, I> {
    pub fn new(plan: StreamEncoder<T>, input: I) -> Self {
        Self {
            session: EncodeSession::new(plan),
            input: Some(input),
        }
    }

    /// Give back the unread part of the input once the plan has completed
    /// or failed.
    pub fn into_remaining(self) -> Option<I> {
        self.input
    }
}

impl<T, I: Iterator<Item = T>> Iterator for EncodeIter<T, I> {
    type Item = Result<BitVector>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.session.step() {
                Ok(Progress::Ready(bits)) => return Some(Ok(bits)),
                Ok(Progress::Done) => return None,
                Ok(Progress::NeedInput) => {
                    match self.input.as_mut().and_then(Iterator::next) {
                        Some(value) => self.session.push_value(value),
                        None => {
                            self.input = None;
                            self.session.end_of_input();
                        }
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<T, I: Iterator<Item = T>> FusedIterator for EncodeIter<T, I> {}

impl<T: 'static> StreamEncoder<T> {
    /// Encode values lazily.
    pub fn encode<I: IntoIterator<Item = T>>(&self, values: I) -> EncodeIter<T, I::IntoIter> {
        EncodeIter::new(self.clone(), values.into_iter())
    }

    /// Encode every value into one contiguous region.
    pub fn encode_all<I: IntoIterator<Item = T>>(&self, values: I) -> Result<BitVector> {
        let mut out = BitBuffer::new();
        for chunk in self.encode(values) {
            out.push(&chunk?);
        }
        Ok(out.freeze())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;

    use codecstream_codec::codecs::{int32, uint8};
    use codecstream_codec::Codec;

    use super::*;
    use crate::decoder::{many, once};
    use crate::error::StreamError;
    use crate::pull::from_chunks;

    struct Counting {
        chunks: Vec<BitVector>,
        pulls: Rc<Cell<usize>>,
        cancelled: Rc<Cell<bool>>,
    }

    impl Pull for Counting {
        fn pull(&mut self) -> Result<Option<BitVector>> {
            self.pulls.set(self.pulls.get() + 1);
            if self.chunks.is_empty() {
                return Ok(None);
            }
            Ok(Some(self.chunks.remove(0)))
        }

        fn cancel(&mut self) {
            self.cancelled.set(true);
        }
    }

    fn counting(chunks: Vec<BitVector>) -> (Counting, Rc<Cell<usize>>, Rc<Cell<bool>>) {
        let pulls = Rc::new(Cell::new(0));
        let cancelled = Rc::new(Cell::new(false));
        (
            Counting {
                chunks,
                pulls: Rc::clone(&pulls),
                cancelled: Rc::clone(&cancelled),
            },
            pulls,
            cancelled,
        )
    }

    #[test]
    fn decodes_across_chunks() {
        let input = int32().encode(&-9).unwrap().concat(&int32().encode(&12).unwrap());
        let chunks: Vec<BitVector> = input.chunks(5).collect();
        let values: Vec<i32> = many(int32())
            .decode(from_chunks(chunks))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(values, vec![-9, 12]);
    }

    #[test]
    fn pulls_on_demand_only() {
        let (source, pulls, _) = counting(vec![
            BitVector::from_bytes(vec![1]),
            BitVector::from_bytes(vec![2]),
            BitVector::from_bytes(vec![3]),
        ]);
        let mut iter = many(uint8()).decode(source);
        assert_eq!(iter.next().unwrap().unwrap(), 1);
        assert_eq!(pulls.get(), 1);
        assert_eq!(iter.next().unwrap().unwrap(), 2);
        assert_eq!(pulls.get(), 2);
    }

    #[test]
    fn early_completion_cancels_source() {
        let (source, pulls, cancelled) = counting(vec![
            BitVector::from_bytes(vec![1]),
            BitVector::from_bytes(vec![2]),
        ]);
        let mut iter = once(uint8()).decode(source);
        assert_eq!(iter.next().unwrap().unwrap(), 1);
        assert!(iter.next().is_none());
        assert!(cancelled.get());
        assert!(!iter.has_source());
        assert_eq!(pulls.get(), 1);
        assert!(iter.next().is_none());
    }

    #[test]
    fn explicit_cancel_releases_source() {
        let (source, _, cancelled) = counting(vec![BitVector::from_bytes(vec![1, 2])]);
        let mut iter = many(uint8()).decode(source);
        assert_eq!(iter.next().unwrap().unwrap(), 1);
        iter.cancel();
        assert!(cancelled.get());
        assert!(iter.next().is_none());
    }

    #[test]
    fn source_error_ends_iteration() {
        let chunks: Vec<std::result::Result<BitVector, std::io::Error>> = vec![
            Ok(BitVector::from_bytes(vec![5])),
            Err(std::io::Error::other("gone")),
        ];
        let mut iter = many(uint8()).decode(crate::pull::IterSource::new(chunks.into_iter()));
        assert_eq!(iter.next().unwrap().unwrap(), 5);
        assert!(matches!(iter.next(), Some(Err(StreamError::Source(_)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn decode_reader_uses_chunk_size() {
        let config = SessionConfig::default().with_read_chunk_size(1);
        let values: Vec<u8> = many(uint8())
            .decode_reader(Cursor::new(vec![4, 5, 6]), config)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(values, vec![4, 5, 6]);
    }

    #[test]
    fn encode_all_concatenates() {
        let plan = StreamEncoder::many(uint8()).concat(StreamEncoder::emit(vec![0]));
        let bits = plan.encode_all([1u8, 2]).unwrap();
        assert_eq!(bits.to_bytes().as_ref(), &[1, 2, 0]);
    }

    #[test]
    fn encode_takes_values_lazily() {
        let mut iter = StreamEncoder::once(uint8()).encode(vec![1u8, 2, 3]);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        let rest: Vec<u8> = iter.into_remaining().unwrap().collect();
        assert_eq!(rest, vec![2, 3]);
    }
}
