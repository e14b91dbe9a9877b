//! Scalar codecs.
//!
//! Enough building blocks to describe length-prefixed records: fixed-width
//! integers in either byte order, raw bit and byte blocks, size-prefixed
//! byte blocks and strings, constants and an always-failing codec.

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use codecstream_bits::{BitBuffer, BitVector};

use crate::codec::{Codec, DecodeResult};
use crate::error::{CodecError, Result};

/// Byte order of a multi-byte integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

/// Split off the first `n` bits or report how many were missing.
fn acquire(bits: &BitVector, n: u64) -> Result<(BitVector, BitVector)> {
    if bits.len() < n {
        return Err(CodecError::insufficient(n, bits.len()));
    }
    Ok(bits.split_at(n))
}

/// Primitive integers with a fixed byte width.
pub trait FixedWidth: Copy + fmt::Display + Send + Sync + 'static {
    const BYTES: usize;

    fn read(bytes: &[u8], order: ByteOrder) -> Self;

    fn write(self, order: ByteOrder) -> Vec<u8>;
}

macro_rules! fixed_width {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FixedWidth for $ty {
                const BYTES: usize = std::mem::size_of::<$ty>();

                fn read(bytes: &[u8], order: ByteOrder) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::BYTES]);
                    match order {
                        ByteOrder::Big => <$ty>::from_be_bytes(raw),
                        ByteOrder::Little => <$ty>::from_le_bytes(raw),
                    }
                }

                fn write(self, order: ByteOrder) -> Vec<u8> {
                    match order {
                        ByteOrder::Big => self.to_be_bytes().to_vec(),
                        ByteOrder::Little => self.to_le_bytes().to_vec(),
                    }
                }
            }
        )*
    };
}

fixed_width!(i8, u8, i16, u16, i32, u32, i64, u64);

/// Fixed-width integer codec.
pub struct Int<N> {
    order: ByteOrder,
    _width: PhantomData<fn() -> N>,
}

impl<N> Int<N> {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            _width: PhantomData,
        }
    }
}

impl<N> Clone for Int<N> {
    fn clone(&self) -> Self {
        Self::new(self.order)
    }
}

impl<N> Copy for Int<N> {}

impl<N> fmt::Debug for Int<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Int")
            .field("bytes", &std::mem::size_of::<N>())
            .field("order", &self.order)
            .finish()
    }
}

impl<N: FixedWidth> Codec for Int<N> {
    type Value = N;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<N>> {
        let (head, rest) = acquire(bits, N::BYTES as u64 * 8)?;
        Ok(DecodeResult::new(
            N::read(head.to_bytes().as_ref(), self.order),
            rest,
        ))
    }

    fn encode(&self, value: &N) -> Result<BitVector> {
        Ok(BitVector::from_bytes(value.write(self.order)))
    }
}

pub fn int8() -> Int<i8> {
    Int::new(ByteOrder::Big)
}

pub fn uint8() -> Int<u8> {
    Int::new(ByteOrder::Big)
}

pub fn int16() -> Int<i16> {
    Int::new(ByteOrder::Big)
}

pub fn uint16() -> Int<u16> {
    Int::new(ByteOrder::Big)
}

pub fn int32() -> Int<i32> {
    Int::new(ByteOrder::Big)
}

pub fn uint32() -> Int<u32> {
    Int::new(ByteOrder::Big)
}

pub fn int64() -> Int<i64> {
    Int::new(ByteOrder::Big)
}

pub fn uint64() -> Int<u64> {
    Int::new(ByteOrder::Big)
}

pub fn int16_le() -> Int<i16> {
    Int::new(ByteOrder::Little)
}

pub fn uint16_le() -> Int<u16> {
    Int::new(ByteOrder::Little)
}

pub fn int32_le() -> Int<i32> {
    Int::new(ByteOrder::Little)
}

pub fn uint32_le() -> Int<u32> {
    Int::new(ByteOrder::Little)
}

pub fn int64_le() -> Int<i64> {
    Int::new(ByteOrder::Little)
}

pub fn uint64_le() -> Int<u64> {
    Int::new(ByteOrder::Little)
}

/// Unsigned big-endian integer of an arbitrary width between 1 and 64 bits.
#[derive(Debug, Clone, Copy)]
pub struct UInt {
    bits: u32,
}

/// # Panics
///
/// Panics unless `1 <= bits <= 64`.
pub fn uint(bits: u32) -> UInt {
    assert!((1..=64).contains(&bits), "uint width must be 1..=64, got {bits}");
    UInt { bits }
}

impl Codec for UInt {
    type Value = u64;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<u64>> {
        let (head, rest) = acquire(bits, u64::from(self.bits))?;
        let value = head
            .to_u64()
            .ok_or_else(|| CodecError::malformed("integer wider than 64 bits"))?;
        Ok(DecodeResult::new(value, rest))
    }

    fn encode(&self, value: &u64) -> Result<BitVector> {
        if self.bits < 64 && value >> self.bits != 0 {
            return Err(CodecError::malformed(format!(
                "{value} does not fit in {} bits",
                self.bits
            )));
        }
        Ok(BitVector::from_u64(*value, self.bits))
    }
}

/// A single bit.
#[derive(Debug, Clone, Copy)]
pub struct Bool;

pub fn bool() -> Bool {
    Bool
}

impl Codec for Bool {
    type Value = bool;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<bool>> {
        let (head, rest) = acquire(bits, 1)?;
        Ok(DecodeResult::new(head.get(0) == Some(true), rest))
    }

    fn encode(&self, value: &bool) -> Result<BitVector> {
        Ok(BitVector::from_bools([*value]))
    }
}

/// Exactly `n` raw bits.
#[derive(Debug, Clone, Copy)]
pub struct Bits {
    len: u64,
}

pub fn bits(len: u64) -> Bits {
    Bits { len }
}

impl Codec for Bits {
    type Value = BitVector;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<BitVector>> {
        let (head, rest) = acquire(bits, self.len)?;
        Ok(DecodeResult::new(head, rest))
    }

    fn encode(&self, value: &BitVector) -> Result<BitVector> {
        if value.len() != self.len {
            return Err(CodecError::malformed(format!(
                "expected {} bits, got {}",
                self.len,
                value.len()
            )));
        }
        Ok(value.clone())
    }
}

/// Exactly `n` bytes.
#[derive(Debug, Clone, Copy)]
pub struct FixedBytes {
    len: usize,
}

pub fn bytes(len: usize) -> FixedBytes {
    FixedBytes { len }
}

impl Codec for FixedBytes {
    type Value = Bytes;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<Bytes>> {
        let width = (self.len as u64)
            .checked_mul(8)
            .ok_or_else(|| CodecError::malformed(format!("size {} overflows", self.len)))?;
        let (head, rest) = acquire(bits, width)?;
        Ok(DecodeResult::new(head.to_bytes(), rest))
    }

    fn encode(&self, value: &Bytes) -> Result<BitVector> {
        if value.len() != self.len {
            return Err(CodecError::malformed(format!(
                "expected {} bytes, got {}",
                self.len,
                value.len()
            )));
        }
        Ok(BitVector::from_bytes(value.clone()))
    }
}

/// Bytes preceded by their count as an unsigned integer of `size_bits` bits.
#[derive(Debug, Clone, Copy)]
pub struct VariableSizeBytes {
    size: UInt,
}

/// # Panics
///
/// Panics unless `1 <= size_bits <= 64`.
pub fn variable_size_bytes(size_bits: u32) -> VariableSizeBytes {
    VariableSizeBytes {
        size: uint(size_bits),
    }
}

impl Codec for VariableSizeBytes {
    type Value = Bytes;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<Bytes>> {
        let prefix = self.size.decode(bits)?;
        let body_bits = prefix
            .value
            .checked_mul(8)
            .ok_or_else(|| CodecError::malformed(format!("size {} overflows", prefix.value)))?;
        let header_bits = u64::from(self.size.bits);
        if prefix.remainder.len() < body_bits {
            return Err(CodecError::insufficient(
                header_bits.saturating_add(body_bits),
                bits.len(),
            ));
        }
        let (body, rest) = prefix.remainder.split_at(body_bits);
        Ok(DecodeResult::new(body.to_bytes(), rest))
    }

    fn encode(&self, value: &Bytes) -> Result<BitVector> {
        let prefix = self.size.encode(&(value.len() as u64))?;
        let mut buf = BitBuffer::with_capacity(prefix.len() + value.len() as u64 * 8);
        buf.push(&prefix);
        buf.push_bytes(value);
        Ok(buf.freeze())
    }
}

/// UTF-8 text preceded by its byte length as a 32-bit big-endian integer.
#[derive(Debug, Clone, Copy)]
pub struct Utf8 {
    inner: VariableSizeBytes,
}

pub fn utf8_32() -> Utf8 {
    Utf8 {
        inner: variable_size_bytes(32),
    }
}

impl Codec for Utf8 {
    type Value = String;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<String>> {
        let raw = self.inner.decode(bits)?;
        let text = String::from_utf8(raw.value.to_vec())
            .map_err(|err| CodecError::malformed(format!("invalid utf-8: {err}")))?;
        Ok(DecodeResult::new(text, raw.remainder))
    }

    fn encode(&self, value: &String) -> Result<BitVector> {
        self.inner.encode(&Bytes::copy_from_slice(value.as_bytes()))
    }
}

/// A fixed bit pattern that must appear verbatim.
#[derive(Debug, Clone)]
pub struct Constant {
    expected: BitVector,
}

pub fn constant(expected: impl Into<BitVector>) -> Constant {
    Constant {
        expected: expected.into(),
    }
}

impl Codec for Constant {
    type Value = ();

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<()>> {
        let (head, rest) = acquire(bits, self.expected.len())?;
        if head != self.expected {
            return Err(CodecError::malformed(format!(
                "expected constant {}, got {head}",
                self.expected
            )));
        }
        Ok(DecodeResult::new((), rest))
    }

    fn encode(&self, _value: &()) -> Result<BitVector> {
        Ok(self.expected.clone())
    }
}

/// Rejects every input and every value with the same message.
pub struct Fail<T> {
    message: String,
    _value: PhantomData<fn() -> T>,
}

pub fn fail<T>(message: impl Into<String>) -> Fail<T> {
    Fail {
        message: message.into(),
        _value: PhantomData,
    }
}

impl<T> fmt::Debug for Fail<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fail").field("message", &self.message).finish()
    }
}

impl<T> Codec for Fail<T> {
    type Value = T;

    fn decode(&self, _bits: &BitVector) -> Result<DecodeResult<T>> {
        Err(CodecError::malformed(self.message.clone()))
    }

    fn encode(&self, _value: &T) -> Result<BitVector> {
        Err(CodecError::malformed(self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_big_endian() {
        let bits = int32().encode(&-2).unwrap();
        assert_eq!(bits.to_bytes().as_ref(), &[0xFF, 0xFF, 0xFF, 0xFE]);
        let decoded = int32().decode(&bits).unwrap();
        assert_eq!(decoded.value, -2);
        assert!(decoded.remainder.is_empty());
    }

    #[test]
    fn uint16_little_endian() {
        let bits = BitVector::from_bytes(vec![0x34, 0x12, 0xAA]);
        let decoded = uint16_le().decode(&bits).unwrap();
        assert_eq!(decoded.value, 0x1234);
        assert_eq!(decoded.remainder.to_bytes().as_ref(), &[0xAA]);
    }

    #[test]
    fn int_reports_missing_bits() {
        let bits = BitVector::from_bytes(vec![0, 1]);
        let err = uint32().decode(&bits).unwrap_err();
        assert_eq!(err, CodecError::insufficient(32, 16));
    }

    #[test]
    fn int_decodes_unaligned_input() {
        let bits = BitVector::from_bools([true]).concat(&uint8().encode(&0x81).unwrap());
        let decoded = uint8().decode(&bits.drop(1)).unwrap();
        assert_eq!(decoded.value, 0x81);
    }

    #[test]
    fn uint_rejects_values_too_wide() {
        assert!(uint(4).encode(&15).is_ok());
        let err = uint(4).encode(&16).unwrap_err();
        assert!(!err.is_insufficient());
    }

    #[test]
    fn uint_full_width() {
        let bits = uint(64).encode(&u64::MAX).unwrap();
        assert_eq!(uint(64).decode(&bits).unwrap().value, u64::MAX);
    }

    #[test]
    fn bytes_needs_whole_block() {
        let err = bytes(100).decode(&BitVector::zeros(8)).unwrap_err();
        assert_eq!(err, CodecError::insufficient(800, 8));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn bytes_width_overflow_is_malformed() {
        let err = bytes(usize::MAX).decode(&BitVector::zeros(8)).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn variable_size_bytes_reports_total_needed() {
        let encoded = variable_size_bytes(8)
            .encode(&Bytes::from_static(b"abcd"))
            .unwrap();
        assert_eq!(encoded.len(), 40);
        let err = variable_size_bytes(8)
            .decode(&encoded.take(24))
            .unwrap_err();
        assert_eq!(err, CodecError::insufficient(40, 24));
        let decoded = variable_size_bytes(8).decode(&encoded).unwrap();
        assert_eq!(decoded.value.as_ref(), b"abcd");
    }

    #[test]
    fn utf8_rejects_invalid_text() {
        let mut raw = BitBuffer::new();
        raw.push_bits(2, 32);
        raw.push_bytes(&[0xC3, 0x28]);
        let err = utf8_32().decode(&raw.freeze()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn utf8_roundtrip() {
        let text = "h\u{e9}llo".to_string();
        let bits = utf8_32().encode(&text).unwrap();
        assert_eq!(utf8_32().decode(&bits).unwrap().value, text);
    }

    #[test]
    fn constant_mismatch_is_malformed() {
        let codec = constant(vec![0xCA, 0xFE]);
        assert!(codec.decode(&BitVector::from_bytes(vec![0xCA, 0xFE])).is_ok());
        let err = codec
            .decode(&BitVector::from_bytes(vec![0xCA, 0xFF]))
            .unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
        let short = codec.decode(&BitVector::from_bytes(vec![0xCA])).unwrap_err();
        assert!(short.is_insufficient());
    }

    #[test]
    fn fail_rejects_both_directions() {
        let codec = fail::<u8>("unsupported");
        assert!(codec.decode(&BitVector::zeros(8)).is_err());
        assert!(codec.encode(&1).is_err());
    }

    #[test]
    fn bool_single_bit() {
        let decoded = bool().decode(&BitVector::from_bools([true, false])).unwrap();
        assert!(decoded.value);
        assert_eq!(decoded.remainder.len(), 1);
    }
}
