//! Async adapters (feature `async`).
//!
//! Same sessions as the blocking adapters, driven from `poll_next`. A
//! [`CancellationToken`] may be attached; once it fires the adapter cancels
//! and drops its source and ends without polling it again.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use codecstream_bits::BitVector;
use futures_core::Stream;
use tokio::io::AsyncRead;
use tokio_util::codec::{BytesCodec, FramedRead};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::debug;

use crate::config::SessionConfig;
use crate::decoder::{Element, StreamDecoder};
use crate::driver::{DecodeSession, EncodeSession, Progress};
use crate::encoder::StreamEncoder;
use crate::error::{Result, StreamError};

/// A non-blocking source of bit chunks.
pub trait AsyncPull: Unpin {
    /// `Ready(Ok(None))` means the source is finished.
    fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<BitVector>>>;

    /// Release external resources; called before the adapter drops the
    /// source on cancellation or early completion.
    fn cancel(&mut self) {}
}

/// Pulls chunks from a stream of results.
pub struct StreamSource<S> {
    inner: Option<Pin<Box<S>>>,
}

impl<S> StreamSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Some(Box::pin(inner)),
        }
    }
}

impl<S, E> AsyncPull for StreamSource<S>
where
    S: Stream<Item = std::result::Result<BitVector, E>>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<BitVector>>> {
        let Some(inner) = self.inner.as_mut() else {
            return Poll::Ready(Ok(None));
        };
        match inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Ok(Some(chunk))),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Err(StreamError::from_source(err))),
            Poll::Ready(None) => {
                self.inner = None;
                Poll::Ready(Ok(None))
            }
        }
    }

    fn cancel(&mut self) {
        self.inner = None;
    }
}

/// Pulls byte chunks from any `AsyncRead`.
pub struct ReaderSource<R> {
    inner: Option<Pin<Box<FramedRead<R, BytesCodec>>>>,
}

impl<R: AsyncRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, &SessionConfig::default())
    }

    pub fn with_config(reader: R, config: &SessionConfig) -> Self {
        let framed = FramedRead::with_capacity(reader, BytesCodec::new(), config.read_chunk_size);
        Self {
            inner: Some(Box::pin(framed)),
        }
    }
}

impl<R: AsyncRead> AsyncPull for ReaderSource<R> {
    fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<BitVector>>> {
        let Some(inner) = self.inner.as_mut() else {
            return Poll::Ready(Ok(None));
        };
        match inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(bytes))) => {
                Poll::Ready(Ok(Some(BitVector::from_bytes(bytes.freeze()))))
            }
            Poll::Ready(Some(Err(err))) => Poll::Ready(Err(StreamError::Io(err))),
            Poll::Ready(None) => {
                self.inner = None;
                Poll::Ready(Ok(None))
            }
        }
    }

    fn cancel(&mut self) {
        self.inner = None;
    }
}

type Cancelled = Pin<Box<WaitForCancellationFutureOwned>>;

fn poll_cancelled(cancelled: &mut Option<Cancelled>, cx: &mut Context<'_>) -> bool {
    let fired = cancelled
        .as_mut()
        .is_some_and(|wait| wait.as_mut().poll(cx).is_ready());
    if fired {
        *cancelled = None;
    }
    fired
}

/// Decoded values as a `Stream`.
pub struct DecodeStream<T, P> {
    session: DecodeSession<T>,
    source: Option<P>,
    cancelled: Option<Cancelled>,
}

// Nothing is structurally pinned.
impl<T, P> Unpin for DecodeStream<T, P> {}

impl<T: Element, P: AsyncPull> DecodeStream<T, P> {
    pub fn new(plan: StreamDecoder<T>, source: P) -> Self {
        Self::with_config(plan, source, SessionConfig::default())
    }

    pub fn with_config(plan: StreamDecoder<T>, source: P, config: SessionConfig) -> Self {
        Self {
            session: DecodeSession::with_config(plan, config),
            source: Some(source),
            cancelled: None,
        }
    }

    /// End the stream when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancelled = Some(Box::pin(token.cancelled_owned()));
        self
    }

    /// Stop decoding and release the source.
    pub fn cancel(&mut self) {
        self.session.abort();
        self.release();
    }

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

impl<T: Element, P: AsyncPull> Stream for DecodeStream<T, P> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if poll_cancelled(&mut this.cancelled, cx) {
            debug!("decode stream cancelled");
            this.cancel();
            return Poll::Ready(None);
        }
        loop {
            match this.session.step() {
                Ok(Progress::Ready(value)) => return Poll::Ready(Some(Ok(value))),
                Ok(Progress::Done) => {
                    this.release();
                    return Poll::Ready(None);
                }
                Ok(Progress::NeedInput) => {
                    let Some(source) = this.source.as_mut() else {
                        this.session.end_of_input();
                        continue;
                    };
                    match source.poll_pull(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Ok(Some(chunk))) => this.session.push_chunk(chunk),
                        Poll::Ready(Ok(None)) => {
                            this.session.end_of_input();
                            this.source = None;
                        }
                        Poll::Ready(Err(err)) => {
                            this.cancel();
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                }
                Err(err) => {
                    this.release();
                    return Poll::Ready(Some(Err(err)));
                }
            }
        }
    }
}

/// Encoded chunks as a `Stream`, taking values from `input` on demand.
pub struct EncodeStream<T, S> {
    session: EncodeSession<T>,
    input: Option<Pin<Box<S>>>,
    cancelled: Option<Cancelled>,
}

impl<T, S> Unpin for EncodeStream<T, S> {}

impl<T, S: Stream<Item = T>> EncodeStream<T, S> {
    pub fn new(plan: StreamEncoder<T>, input: S) -> Self {
        Self {
            session: EncodeSession::new(plan),
            input: Some(Box::pin(input)),
            cancelled: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancelled = Some(Box::pin(token.cancelled_owned()));
        self
    }

    pub fn cancel(&mut self) {
        self.session.abort();
        self.input = None;
    }
}

impl<T, S: Stream<Item = T>> Stream for EncodeStream<T, S> {
    type Item = Result<BitVector>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if poll_cancelled(&mut this.cancelled, cx) {
            debug!("encode stream cancelled");
            this.cancel();
            return Poll::Ready(None);
        }
        loop {
            match this.session.step() {
                Ok(Progress::Ready(bits)) => return Poll::Ready(Some(Ok(bits))),
                Ok(Progress::Done) => {
                    this.input = None;
                    return Poll::Ready(None);
                }
                Ok(Progress::NeedInput) => {
                    let Some(input) = this.input.as_mut() else {
                        this.session.end_of_input();
                        continue;
                    };
                    match input.as_mut().poll_next(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Some(value)) => this.session.push_value(value),
                        Poll::Ready(None) => {
                            this.input = None;
                            this.session.end_of_input();
                        }
                    }
                }
                Err(err) => return Poll::Ready(Some(Err(err))),
            }
        }
    }
}

impl<T: Element> StreamDecoder<T> {
    /// Decode values from an async source as a `Stream`.
    pub fn decode_stream<P: AsyncPull>(&self, source: P) -> DecodeStream<T, P> {
        DecodeStream::new(self.clone(), source)
    }

    /// Decode values from an `AsyncRead` as a `Stream`.
    pub fn decode_async_reader<R: AsyncRead>(
        &self,
        reader: R,
        config: SessionConfig,
    ) -> DecodeStream<T, ReaderSource<R>> {
        DecodeStream::with_config(self.clone(), ReaderSource::with_config(reader, &config), config)
    }
}

impl<T: 'static> StreamEncoder<T> {
    /// Encode values from a `Stream` as a `Stream` of chunks.
    pub fn encode_stream<S: Stream<Item = T>>(&self, values: S) -> EncodeStream<T, S> {
        EncodeStream::new(self.clone(), values)
    }
}
