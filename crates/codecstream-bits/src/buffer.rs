use bytes::{BufMut, Bytes, BytesMut};

use crate::vector::BitVector;

/// Growable bit builder; `freeze` turns it into a [`BitVector`].
#[derive(Debug, Default)]
pub struct BitBuffer {
    bytes: BytesMut,
    len: u64,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with room for `bits` bits.
    pub fn with_capacity(bits: u64) -> Self {
        Self {
            bytes: BytesMut::with_capacity(bits.div_ceil(8) as usize),
            len: 0,
        }
    }

    /// Number of bits written so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_bit(&mut self, bit: bool) {
        self.push_bits(u64::from(bit), 1);
    }

    /// Append the low `count` bits of `value`, most significant first.
    pub fn push_bits(&mut self, value: u64, count: u32) {
        debug_assert!(count <= 64);
        let mut remaining = count;
        while remaining > 0 {
            let used = (self.len % 8) as u32;
            if used == 0 {
                self.bytes.put_u8(0);
            }
            let free = 8 - used;
            let n = free.min(remaining);
            let chunk = ((value >> (remaining - n)) & ((1u64 << n) - 1)) as u8;
            let last = self.bytes.len() - 1;
            self.bytes[last] |= chunk << (free - n);
            self.len += u64::from(n);
            remaining -= n;
        }
    }

    /// Append whole bytes.
    pub fn push_bytes(&mut self, data: &[u8]) {
        if self.len % 8 == 0 {
            self.bytes.extend_from_slice(data);
            self.len += data.len() as u64 * 8;
            return;
        }
        for byte in data {
            self.push_bits(u64::from(*byte), 8);
        }
    }

    /// Append every bit of `bits`.
    pub fn push(&mut self, bits: &BitVector) {
        if bits.offset == 0 {
            let whole = (bits.len / 8) as usize;
            self.push_bytes(&bits.data[..whole]);
            let tail = (bits.len % 8) as u32;
            if tail > 0 {
                self.push_bits(bits.read_bits(whole as u64 * 8, tail), tail);
            }
            return;
        }
        let mut pos = 0;
        while pos < bits.len {
            let n = (bits.len - pos).min(64) as u32;
            self.push_bits(bits.read_bits(pos, n), n);
            pos += u64::from(n);
        }
    }

    /// Remove and return every complete byte, keeping a trailing partial byte.
    pub fn split_whole_bytes(&mut self) -> Bytes {
        let whole = (self.len / 8) as usize;
        self.len %= 8;
        self.bytes.split_to(whole).freeze()
    }

    pub fn freeze(self) -> BitVector {
        BitVector {
            data: self.bytes.freeze(),
            offset: 0,
            len: self.len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_bits_across_byte_boundary() {
        let mut buf = BitBuffer::new();
        buf.push_bits(0b101, 3);
        buf.push_bits(0xFF, 8);
        assert_eq!(buf.len(), 11);
        let bits = buf.freeze();
        assert_eq!(bits.to_bytes().as_ref(), &[0b1011_1111, 0b1110_0000]);
    }

    #[test]
    fn push_bits_masks_high_bits() {
        let mut buf = BitBuffer::new();
        buf.push_bits(0xFFFF_FFFF, 4);
        assert_eq!(buf.freeze().to_u64(), Some(0xF));
    }

    #[test]
    fn push_aligned_vector_copies_bytes() {
        let mut buf = BitBuffer::new();
        buf.push(&BitVector::from_bytes(vec![1, 2, 3]));
        assert_eq!(buf.len(), 24);
        assert_eq!(buf.freeze().to_bytes().as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn push_sixty_four_bits() {
        let mut buf = BitBuffer::new();
        buf.push_bits(u64::MAX, 64);
        assert_eq!(buf.freeze().to_u64(), Some(u64::MAX));
    }

    #[test]
    fn split_whole_bytes_keeps_partial_tail() {
        let mut buf = BitBuffer::new();
        buf.push_bytes(&[0xAA, 0xBB]);
        buf.push_bits(0b11, 2);
        let whole = buf.split_whole_bytes();
        assert_eq!(whole.as_ref(), &[0xAA, 0xBB]);
        assert_eq!(buf.len(), 2);
        buf.push_bits(0, 6);
        assert_eq!(buf.split_whole_bytes().as_ref(), &[0b1100_0000]);
        assert!(buf.is_empty());
    }
}
