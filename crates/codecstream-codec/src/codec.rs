use std::sync::Arc;

use codecstream_bits::BitVector;

use crate::error::Result;

/// A decoded value plus the bits that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResult<T> {
    pub value: T,
    pub remainder: BitVector,
}

impl<T> DecodeResult<T> {
    pub fn new(value: T, remainder: BitVector) -> Self {
        Self { value, remainder }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DecodeResult<U> {
        DecodeResult {
            value: f(self.value),
            remainder: self.remainder,
        }
    }
}

/// Decode/encode capability for a single value type.
///
/// Implementations must be prefix-exact: `decode` reads only the bits of one
/// value and hands back everything after it untouched. When the input ends
/// before the value does, report [`CodecError::InsufficientInput`] rather
/// than `Malformed`; the stream driver treats the former as "pull more".
///
/// [`CodecError::InsufficientInput`]: crate::CodecError::InsufficientInput
pub trait Codec: Send + Sync {
    type Value;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<Self::Value>>;

    fn encode(&self, value: &Self::Value) -> Result<BitVector>;
}

impl<C: Codec + ?Sized> Codec for Arc<C> {
    type Value = C::Value;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<Self::Value>> {
        (**self).decode(bits)
    }

    fn encode(&self, value: &Self::Value) -> Result<BitVector> {
        (**self).encode(value)
    }
}

impl<C: Codec + ?Sized> Codec for Box<C> {
    type Value = C::Value;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<Self::Value>> {
        (**self).decode(bits)
    }

    fn encode(&self, value: &Self::Value) -> Result<BitVector> {
        (**self).encode(value)
    }
}

/// Combinators available on every codec.
pub trait CodecExt: Codec + Sized {
    /// Name this codec in the path of every error it reports.
    fn with_context(self, segment: impl Into<String>) -> Contextual<Self> {
        Contextual {
            inner: self,
            segment: segment.into(),
        }
    }

    /// Adapt the value type with a pair of conversions.
    ///
    /// `decode_map` runs on every decoded value. `encode_map` may reject a
    /// value with a `Malformed` error before it reaches the inner codec.
    fn xmap<U, D, E>(self, decode_map: D, encode_map: E) -> XMap<Self, D, E>
    where
        D: Fn(Self::Value) -> U + Send + Sync,
        E: Fn(&U) -> Result<Self::Value> + Send + Sync,
    {
        XMap {
            inner: self,
            decode_map,
            encode_map,
        }
    }
}

impl<C: Codec> CodecExt for C {}

/// See [`CodecExt::xmap`].
#[derive(Clone)]
pub struct XMap<C, D, E> {
    inner: C,
    decode_map: D,
    encode_map: E,
}

impl<C, D, E> std::fmt::Debug for XMap<C, D, E>
where
    C: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XMap").field("inner", &self.inner).finish()
    }
}

impl<C, U, D, E> Codec for XMap<C, D, E>
where
    C: Codec,
    D: Fn(C::Value) -> U + Send + Sync,
    E: Fn(&U) -> Result<C::Value> + Send + Sync,
{
    type Value = U;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<U>> {
        Ok(self.inner.decode(bits)?.map(&self.decode_map))
    }

    fn encode(&self, value: &U) -> Result<BitVector> {
        self.inner.encode(&(self.encode_map)(value)?)
    }
}

/// See [`CodecExt::with_context`].
#[derive(Debug, Clone)]
pub struct Contextual<C> {
    inner: C,
    segment: String,
}

impl<C: Codec> Codec for Contextual<C> {
    type Value = C::Value;

    fn decode(&self, bits: &BitVector) -> Result<DecodeResult<Self::Value>> {
        self.inner
            .decode(bits)
            .map_err(|err| err.push_context(self.segment.as_str()))
    }

    fn encode(&self, value: &Self::Value) -> Result<BitVector> {
        self.inner
            .encode(value)
            .map_err(|err| err.push_context(self.segment.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::{fail, uint8};
    use crate::CodecError;

    #[test]
    fn decode_result_map_keeps_remainder() {
        let rest = BitVector::from_bytes(vec![9]);
        let mapped = DecodeResult::new(2u8, rest.clone()).map(u32::from);
        assert_eq!(mapped.value, 2u32);
        assert_eq!(mapped.remainder, rest);
    }

    #[test]
    fn with_context_names_failures() {
        let codec = fail::<u8>("nope").with_context("header");
        let err = codec.decode(&BitVector::empty()).unwrap_err();
        assert_eq!(err.to_string(), "header: nope");
    }

    #[test]
    fn with_context_passes_successes_through() {
        let codec = uint8().with_context("tag");
        let decoded = codec.decode(&BitVector::from_bytes(vec![7, 8])).unwrap();
        assert_eq!(decoded.value, 7);
        assert_eq!(decoded.remainder.len(), 8);
    }

    #[test]
    fn xmap_converts_both_ways() {
        let codec = uint8().xmap(
            |raw| raw == 1,
            |flag: &bool| Ok(u8::from(*flag)),
        );
        assert!(codec.decode(&BitVector::from_bytes(vec![1])).unwrap().value);
        assert_eq!(
            codec.encode(&false).unwrap(),
            BitVector::from_bytes(vec![0])
        );
    }

    #[test]
    fn shared_codec_delegates() {
        let codec: Arc<dyn Codec<Value = u8>> = Arc::new(uint8());
        let err = codec.decode(&BitVector::empty()).unwrap_err();
        assert_eq!(err, CodecError::insufficient(8, 0));
    }
}
