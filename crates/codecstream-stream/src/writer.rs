use std::io::{ErrorKind, Write};

use bytes::Bytes;
use codecstream_bits::{BitBuffer, BitVector};

use crate::error::{Result, StreamError};

/// Packs encoded chunks into bytes and writes them to any `Write` stream.
///
/// Chunks need not be byte aligned. Whole bytes are written as soon as they
/// are complete; the final partial byte is zero padded by
/// [`finish`](Self::finish).
pub struct EncodeWriter<W> {
    inner: W,
    pending: BitBuffer,
    bits_written: u64,
}

impl<W: Write> EncodeWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            pending: BitBuffer::new(),
            bits_written: 0,
        }
    }

    /// Write one chunk.
    pub fn write_bits(&mut self, bits: &BitVector) -> Result<()> {
        self.pending.push(bits);
        self.bits_written += bits.len();
        let whole = self.pending.split_whole_bytes();
        self.write_bytes(&whole)
    }

    /// Write every chunk of an encode stream, stopping at the first error.
    /// Returns the number of bits written.
    pub fn write_all_chunks<I>(&mut self, chunks: I) -> Result<u64>
    where
        I: IntoIterator<Item = Result<BitVector>>,
    {
        let before = self.bits_written;
        for chunk in chunks {
            self.write_bits(&chunk?)?;
        }
        Ok(self.bits_written - before)
    }

    /// Total bits accepted so far, excluding padding.
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Pad the last partial byte with zeros, flush, and return the stream.
    pub fn finish(mut self) -> Result<W> {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            let tail = pending.freeze().to_bytes();
            self.write_bytes(&tail)?;
        }
        self.flush()?;
        Ok(self.inner)
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    fn write_bytes(&mut self, bytes: &Bytes) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(StreamError::Io(ErrorKind::WriteZero.into())),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use codecstream_codec::codecs::{uint, uint8};
    use codecstream_codec::Codec;

    use super::*;
    use crate::encoder::StreamEncoder;

    #[test]
    fn packs_unaligned_chunks() {
        let mut writer = EncodeWriter::new(Vec::new());
        let chunks = StreamEncoder::many(uint(4)).encode([0xAu64, 0xB, 0xC]);
        assert_eq!(writer.write_all_chunks(chunks).unwrap(), 12);
        assert_eq!(writer.get_ref().as_slice(), &[0xAB]);
        let out = writer.finish().unwrap();
        assert_eq!(out, vec![0xAB, 0xC0]);
    }

    #[test]
    fn stops_at_first_encode_error() {
        let mut writer = EncodeWriter::new(Vec::new());
        let chunks = StreamEncoder::many(uint(4)).encode([1u64, 99, 2]);
        assert!(writer.write_all_chunks(chunks).is_err());
        assert_eq!(writer.bits_written(), 4);
    }

    #[test]
    fn handles_interrupted_and_would_block() {
        let mut writer = EncodeWriter::new(Flaky {
            calls: 0,
            written: Vec::new(),
        });
        writer.write_bits(&uint8().encode(&9).unwrap()).unwrap();
        let inner = writer.finish().unwrap();
        assert_eq!(inner.written, vec![9]);
    }

    #[test]
    fn zero_write_is_an_error() {
        let mut writer = EncodeWriter::new(ZeroWriter);
        let err = writer.write_bits(&BitVector::from_bytes(vec![1])).unwrap_err();
        assert!(matches!(err, StreamError::Io(ref io) if io.kind() == ErrorKind::WriteZero));
    }

    struct Flaky {
        calls: usize,
        written: Vec<u8>,
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.calls += 1;
            match self.calls {
                1 => Err(std::io::Error::new(ErrorKind::Interrupted, "interrupted")),
                2 => Err(std::io::Error::new(ErrorKind::WouldBlock, "would block")),
                _ => {
                    self.written.extend_from_slice(buf);
                    Ok(buf.len())
                }
            }
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
