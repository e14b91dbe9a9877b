//! Encoder plans.

use std::fmt;
use std::sync::Arc;

use codecstream_bits::BitVector;
use codecstream_codec::Codec;

pub(crate) type SharedCodec<T> = Arc<dyn Codec<Value = T>>;

/// An encoder plan consuming values of type `T` and producing bit chunks.
pub enum StreamEncoder<T> {
    /// Encode the next value, if there is one.
    Once(SharedCodec<T>),
    /// Encode every remaining value.
    Many(SharedCodec<T>),
    /// Encode the next value if the codec accepts it; otherwise output
    /// nothing and leave the value for the next stage.
    TryOnce(SharedCodec<T>),
    /// Output fixed bits without taking a value.
    Emit(BitVector),
    /// Run the first plan to completion, then the second.
    Concatenate(Box<StreamEncoder<T>>, Box<StreamEncoder<T>>),
}

impl<T> Clone for StreamEncoder<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Once(codec) => Self::Once(Arc::clone(codec)),
            Self::Many(codec) => Self::Many(Arc::clone(codec)),
            Self::TryOnce(codec) => Self::TryOnce(Arc::clone(codec)),
            Self::Emit(bits) => Self::Emit(bits.clone()),
            Self::Concatenate(first, second) => Self::Concatenate(first.clone(), second.clone()),
        }
    }
}

impl<T> fmt::Debug for StreamEncoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once(_) => f.write_str("Once"),
            Self::Many(_) => f.write_str("Many"),
            Self::TryOnce(_) => f.write_str("TryOnce"),
            Self::Emit(bits) => f.debug_tuple("Emit").field(bits).finish(),
            Self::Concatenate(first, second) => {
                f.debug_tuple("Concatenate").field(first).field(second).finish()
            }
        }
    }
}

impl<T: 'static> StreamEncoder<T> {
    pub fn once<C: Codec<Value = T> + 'static>(codec: C) -> Self {
        Self::Once(Arc::new(codec))
    }

    pub fn many<C: Codec<Value = T> + 'static>(codec: C) -> Self {
        Self::Many(Arc::new(codec))
    }

    pub fn try_once<C: Codec<Value = T> + 'static>(codec: C) -> Self {
        Self::TryOnce(Arc::new(codec))
    }

    pub fn emit(bits: impl Into<BitVector>) -> Self {
        Self::Emit(bits.into())
    }

    /// `self` then `next`. Both always run.
    pub fn concat(self, next: StreamEncoder<T>) -> Self {
        Self::Concatenate(Box::new(self), Box::new(next))
    }
}
