use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::{BufMut, Bytes, BytesMut};

use crate::buffer::BitBuffer;

/// An immutable, ordered run of bits with a known length.
///
/// Backed by a shared [`Bytes`] buffer plus a bit offset, so slicing is O(1)
/// and clones are reference-count bumps. Bits past `len` inside the last
/// backing byte are never observed.
#[derive(Clone, Default)]
pub struct BitVector {
    pub(crate) data: Bytes,
    /// Bit offset into `data`; always `< 8`.
    pub(crate) offset: u64,
    pub(crate) len: u64,
}

impl BitVector {
    /// The empty region.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap whole bytes without copying.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let len = data.len() as u64 * 8;
        Self {
            data,
            offset: 0,
            len,
        }
    }

    /// The low `bits` bits of `value`, most significant first.
    ///
    /// # Panics
    ///
    /// Panics if `bits > 64`.
    pub fn from_u64(value: u64, bits: u32) -> Self {
        assert!(bits <= 64, "cannot take {bits} bits from a u64");
        let mut buf = BitBuffer::with_capacity(u64::from(bits));
        buf.push_bits(value, bits);
        buf.freeze()
    }

    /// Build a region from individual bits.
    pub fn from_bools(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut buf = BitBuffer::new();
        for bit in bits {
            buf.push_bit(bit);
        }
        buf.freeze()
    }

    /// A region of `len` zero bits.
    pub fn zeros(len: u64) -> Self {
        let bytes = len.div_ceil(8) as usize;
        Self {
            data: Bytes::from(vec![0u8; bytes]),
            offset: 0,
            len,
        }
    }

    /// Number of bits in the region.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes needed to hold the region.
    pub fn byte_len(&self) -> usize {
        self.len.div_ceil(8) as usize
    }

    /// True when the region starts on a byte boundary and holds whole bytes.
    pub fn is_byte_aligned(&self) -> bool {
        self.offset == 0 && self.len % 8 == 0
    }

    /// The bit at `index`, or `None` past the end.
    pub fn get(&self, index: u64) -> Option<bool> {
        (index < self.len).then(|| self.read_bits(index, 1) == 1)
    }

    /// The first `n` bits (or the whole region if it is shorter).
    pub fn take(&self, n: u64) -> Self {
        let len = n.min(self.len);
        let end = (self.offset + len).div_ceil(8) as usize;
        Self {
            data: self.data.slice(..end),
            offset: self.offset,
            len,
        }
    }

    /// Everything after the first `n` bits (empty if `n >= len`).
    pub fn drop(&self, n: u64) -> Self {
        let n = n.min(self.len);
        let start = self.offset + n;
        Self {
            data: self.data.slice((start / 8) as usize..),
            offset: start % 8,
            len: self.len - n,
        }
    }

    /// `(take(n), drop(n))`.
    pub fn split_at(&self, n: u64) -> (Self, Self) {
        (self.take(n), self.drop(n))
    }

    /// This region followed by `other`.
    pub fn concat(&self, other: &BitVector) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut buf = BitBuffer::with_capacity(self.len + other.len);
        buf.push(self);
        buf.push(other);
        buf.freeze()
    }

    /// Split into consecutive pieces of `size` bits; the last may be shorter.
    ///
    /// # Panics
    ///
    /// Panics if `size == 0`.
    pub fn chunks(&self, size: u64) -> impl Iterator<Item = BitVector> + '_ {
        assert!(size > 0, "chunk size must be positive");
        let mut rest = self.clone();
        std::iter::from_fn(move || {
            if rest.is_empty() {
                return None;
            }
            let (head, tail) = rest.split_at(size);
            rest = tail;
            Some(head)
        })
    }

    /// The bits as an unsigned integer, or `None` if the region is wider than 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        (self.len <= 64).then(|| self.read_bits(0, self.len as u32))
    }

    /// The bits packed into bytes; a trailing partial byte is zero-padded.
    ///
    /// Byte-aligned regions are returned without copying.
    pub fn to_bytes(&self) -> Bytes {
        if self.is_byte_aligned() {
            return self.data.slice(..self.byte_len());
        }
        let mut out = BytesMut::with_capacity(self.byte_len());
        let mut pos = 0;
        while pos < self.len {
            let n = (self.len - pos).min(8) as u32;
            let byte = self.read_bits(pos, n) << (8 - n);
            out.put_u8(byte as u8);
            pos += u64::from(n);
        }
        out.freeze()
    }

    /// Iterate over the bits in order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.read_bits(i, 1) == 1)
    }

    /// Read `count <= 64` bits starting at bit `start` of the region.
    pub(crate) fn read_bits(&self, start: u64, count: u32) -> u64 {
        debug_assert!(count <= 64);
        debug_assert!(start + u64::from(count) <= self.len);
        let mut value = 0u64;
        let mut bit = self.offset + start;
        let mut remaining = count;
        while remaining > 0 {
            let byte = self.data[(bit / 8) as usize];
            let used = (bit % 8) as u32;
            let avail = 8 - used;
            let n = avail.min(remaining);
            let chunk = (byte >> (avail - n)) & (((1u16 << n) - 1) as u8);
            value = (value << n) | u64::from(chunk);
            bit += u64::from(n);
            remaining -= n;
        }
        value
    }
}

impl PartialEq for BitVector {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BitVector {}

impl Hash for BitVector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len.hash(state);
        self.to_bytes().hash(state);
    }
}

impl From<Bytes> for BitVector {
    fn from(data: Bytes) -> Self {
        Self::from_bytes(data)
    }
}

impl From<Vec<u8>> for BitVector {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

impl From<&[u8]> for BitVector {
    fn from(data: &[u8]) -> Self {
        Self::from_bytes(Bytes::copy_from_slice(data))
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector({} bits, {self})", self.len)
    }
}

/// Hex when the length is a whole number of nibbles, binary otherwise.
impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len % 4 == 0 {
            f.write_str("0x")?;
            let mut pos = 0;
            while pos < self.len {
                write!(f, "{:x}", self.read_bits(pos, 4))?;
                pos += 4;
            }
        } else {
            f.write_str("0b")?;
            for bit in self.iter() {
                f.write_str(if bit { "1" } else { "0" })?;
            }
        }
        Ok(())
    }
}
