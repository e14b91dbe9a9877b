use bytes::BytesMut;
use codecstream_bits::BitVector;
use tokio_util::codec::Decoder;

use crate::config::SessionConfig;
use crate::decoder::{Element, StreamDecoder};
use crate::driver::{DecodeSession, Progress};
use crate::error::{Result, StreamError};

/// A `tokio_util` decoder that runs a plan over the bytes `FramedRead`
/// buffers.
///
/// Every call moves the buffered bytes into the session, so the read buffer
/// never holds more than one read's worth. Once the plan completes, further
/// input is ignored.
///
/// ```
/// use codecstream_codec::codecs::uint32;
/// use codecstream_stream::{many, PlanCodec};
/// use tokio_util::codec::FramedRead;
///
/// let frames = FramedRead::new(tokio::io::empty(), PlanCodec::new(many(uint32())));
/// # drop(frames);
/// ```
pub struct PlanCodec<T> {
    session: DecodeSession<T>,
}

impl<T: Element> PlanCodec<T> {
    pub fn new(plan: StreamDecoder<T>) -> Self {
        Self::with_config(plan, SessionConfig::default())
    }

    pub fn with_config(plan: StreamDecoder<T>, config: SessionConfig) -> Self {
        Self {
            session: DecodeSession::with_config(plan, config),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    fn feed(&mut self, src: &mut BytesMut) {
        if !src.is_empty() {
            self.session
                .push_chunk(BitVector::from_bytes(src.split().freeze()));
        }
    }

    fn next_value(&mut self) -> Result<Option<T>> {
        match self.session.step()? {
            Progress::Ready(value) => Ok(Some(value)),
            Progress::NeedInput | Progress::Done => Ok(None),
        }
    }
}

impl<T: Element> Decoder for PlanCodec<T> {
    type Item = T;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<T>> {
        self.feed(src);
        self.next_value()
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<T>> {
        self.feed(src);
        self.session.end_of_input();
        self.next_value()
    }
}
