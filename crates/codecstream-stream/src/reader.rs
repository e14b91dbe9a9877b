use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use codecstream_bits::BitVector;
use tracing::trace;

use crate::config::SessionConfig;
use crate::error::{Result, StreamError};
use crate::pull::Pull;

/// Pulls byte chunks from any `Read` stream.
///
/// Each pull performs at most one successful read of up to
/// `read_chunk_size` bytes; short reads are passed on as they are.
pub struct ReadSource<R> {
    inner: R,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> ReadSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, &SessionConfig::default())
    }

    pub fn with_config(inner: R, config: &SessionConfig) -> Self {
        Self {
            inner,
            chunk_size: config.read_chunk_size.max(1),
            done: false,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Pull for ReadSource<R> {
    fn pull(&mut self) -> Result<Option<BitVector>> {
        if self.done {
            return Ok(None);
        }
        let mut buf = BytesMut::zeroed(self.chunk_size);
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => {
                    trace!("reader reached end of stream");
                    self.done = true;
                    return Ok(None);
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Some(BitVector::from_bytes(buf.freeze())));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
    }

    fn cancel(&mut self) {
        self.done = true;
    }
}
