//! Decoder plans.
//!
//! A [`StreamDecoder`] describes how to turn a bit stream into a sequence of
//! values. It is a closed tree of variants that a session interprets; building
//! one has no side effects and the same plan can drive any number of sessions.

use std::fmt;
use std::sync::Arc;

use codecstream_bits::BitVector;
use codecstream_codec::{Codec, CodecError, DecodeResult};

use crate::driver::DecodeOutcome;

/// Values a plan can produce.
pub trait Element: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Element for T {}

type StepResult<T> = codecstream_codec::Result<DecodeResult<StreamDecoder<T>>>;

type StepFn<T> = dyn Fn(&BitVector) -> StepResult<T> + Send + Sync;

/// One decode attempt: reads a prefix of the input and names the plan to
/// run next.
pub struct Step<T> {
    run: Arc<StepFn<T>>,
}

impl<T> Clone for Step<T> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Step")
    }
}

impl<T: Element> Step<T> {
    /// Decode one value with `codec` and emit it.
    pub fn from_codec<C>(codec: C) -> Self
    where
        C: Codec<Value = T> + 'static,
    {
        Self {
            run: Arc::new(move |bits: &BitVector| -> StepResult<T> {
                Ok(codec.decode(bits)?.map(StreamDecoder::emit_one))
            }),
        }
    }

    /// Run the step against `bits` and classify the result.
    pub fn attempt(&self, bits: &BitVector) -> DecodeOutcome<StreamDecoder<T>> {
        if bits.is_empty() {
            return DecodeOutcome::Exhausted;
        }
        match (self.run)(bits) {
            Ok(result) => DecodeOutcome::Produced {
                consumed: bits.len().saturating_sub(result.remainder.len()),
                value: result.value,
            },
            Err(err) => DecodeOutcome::Failed(err),
        }
    }

    fn and_then<U: Element>(self, f: Continuation<T, U>) -> Step<U> {
        Step {
            run: Arc::new(move |bits: &BitVector| -> StepResult<U> {
                let f = Arc::clone(&f);
                Ok((self.run)(bits)?.map(move |next| next.bind(f)))
            }),
        }
    }
}

type Continuation<A, T> = Arc<dyn Fn(A) -> StreamDecoder<T> + Send + Sync>;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A deferred `flat_map`, expanded one level at a time by the driver.
pub trait Bind<T>: Send + Sync {
    fn expand(&self) -> StreamDecoder<T>;
}

struct Bound<A, T> {
    inner: StreamDecoder<A>,
    f: Continuation<A, T>,
}

impl<A: Element, T: Element> Bind<T> for Bound<A, T> {
    fn expand(&self) -> StreamDecoder<T> {
        let f = &self.f;
        match &self.inner {
            StreamDecoder::Emit(values) => {
                let mut plan: Option<StreamDecoder<T>> = None;
                for value in values.iter().rev() {
                    let head = f(value.clone());
                    plan = Some(match plan {
                        Some(rest) => head.append(rest),
                        None => head,
                    });
                }
                plan.unwrap_or_else(StreamDecoder::empty)
            }
            StreamDecoder::Once(step) => StreamDecoder::Once(step.clone().and_then(Arc::clone(f))),
            StreamDecoder::Many(step) => StreamDecoder::Many(step.clone().and_then(Arc::clone(f))),
            StreamDecoder::TryMany(step) => {
                StreamDecoder::TryMany(step.clone().and_then(Arc::clone(f)))
            }
            // Continuations are outer work: each value leaves the region
            // as a deferred plan, run on the bits after the region closes.
            StreamDecoder::Isolate {
                bits,
                inner,
                strict,
            } => {
                let f = Arc::clone(f);
                StreamDecoder::Isolate {
                    bits: *bits,
                    inner: Box::new((**inner).clone().flat_map(move |value| {
                        StreamDecoder::Deferred(Box::new(f(value)))
                    })),
                    strict: *strict,
                }
            }
            StreamDecoder::Deferred(inner) => {
                StreamDecoder::Deferred(Box::new((**inner).clone().bind(Arc::clone(f))))
            }
            StreamDecoder::FlatMap(bind) => bind.expand().bind(Arc::clone(f)),
            StreamDecoder::Filter { inner, predicate } => {
                let predicate = Arc::clone(predicate);
                let f = Arc::clone(f);
                (**inner).clone().flat_map(move |value| {
                    if predicate(&value) {
                        f(value)
                    } else {
                        StreamDecoder::empty()
                    }
                })
            }
            StreamDecoder::Append(first, second) => StreamDecoder::Append(
                Box::new((**first).clone().bind(Arc::clone(f))),
                Box::new((**second).clone().bind(Arc::clone(f))),
            ),
            StreamDecoder::Repeat { inner, times } => StreamDecoder::Repeat {
                inner: Box::new((**inner).clone().bind(Arc::clone(f))),
                times: *times,
            },
            StreamDecoder::Fail(err) => StreamDecoder::Fail(err.clone()),
        }
    }
}

/// A decoder plan producing values of type `T`.
pub enum StreamDecoder<T> {
    /// Yield fixed values without consuming input.
    Emit(Arc<[T]>),
    /// Decode at most one value; failures are terminal.
    Once(Step<T>),
    /// Decode until the input ends; malformed input is terminal.
    Many(Step<T>),
    /// Decode until the input ends or any attempt fails.
    TryMany(Step<T>),
    /// Run `inner` against exactly the next `bits` bits.
    Isolate {
        bits: u64,
        inner: Box<StreamDecoder<T>>,
        strict: bool,
    },
    /// Feed each value of one plan into a function building the next.
    FlatMap(Arc<dyn Bind<T>>),
    /// Drop values rejected by `predicate`.
    Filter {
        inner: Box<StreamDecoder<T>>,
        predicate: Predicate<T>,
    },
    /// Run the first plan, then the second on what remains.
    Append(Box<StreamDecoder<T>>, Box<StreamDecoder<T>>),
    /// Run `inner` again and again, `times` times or until an iteration
    /// makes no progress.
    Repeat {
        inner: Box<StreamDecoder<T>>,
        times: Option<u64>,
    },
    /// Fail with a fixed error.
    Fail(CodecError),
    /// Run `inner` once the innermost open isolate region closes, against
    /// the bits that follow it. Outside any region it runs immediately.
    Deferred(Box<StreamDecoder<T>>),
}

impl<T> Clone for StreamDecoder<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Emit(values) => Self::Emit(Arc::clone(values)),
            Self::Once(step) => Self::Once(step.clone()),
            Self::Many(step) => Self::Many(step.clone()),
            Self::TryMany(step) => Self::TryMany(step.clone()),
            Self::Isolate {
                bits,
                inner,
                strict,
            } => Self::Isolate {
                bits: *bits,
                inner: inner.clone(),
                strict: *strict,
            },
            Self::FlatMap(bind) => Self::FlatMap(Arc::clone(bind)),
            Self::Filter { inner, predicate } => Self::Filter {
                inner: inner.clone(),
                predicate: Arc::clone(predicate),
            },
            Self::Append(first, second) => Self::Append(first.clone(), second.clone()),
            Self::Repeat { inner, times } => Self::Repeat {
                inner: inner.clone(),
                times: *times,
            },
            Self::Fail(err) => Self::Fail(err.clone()),
            Self::Deferred(inner) => Self::Deferred(inner.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StreamDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emit(values) => f.debug_tuple("Emit").field(values).finish(),
            Self::Once(_) => f.write_str("Once"),
            Self::Many(_) => f.write_str("Many"),
            Self::TryMany(_) => f.write_str("TryMany"),
            Self::Isolate {
                bits,
                inner,
                strict,
            } => f
                .debug_struct("Isolate")
                .field("bits", bits)
                .field("strict", strict)
                .field("inner", inner)
                .finish(),
            Self::FlatMap(_) => f.write_str("FlatMap"),
            Self::Filter { inner, .. } => f.debug_tuple("Filter").field(inner).finish(),
            Self::Append(first, second) => {
                f.debug_tuple("Append").field(first).field(second).finish()
            }
            Self::Repeat { inner, times } => f
                .debug_struct("Repeat")
                .field("times", times)
                .field("inner", inner)
                .finish(),
            Self::Fail(err) => f.debug_tuple("Fail").field(err).finish(),
            Self::Deferred(inner) => f.debug_tuple("Deferred").field(inner).finish(),
        }
    }
}

/// Decode at most one value with `codec`.
pub fn once<C>(codec: C) -> StreamDecoder<C::Value>
where
    C: Codec + 'static,
    C::Value: Element,
{
    StreamDecoder::Once(Step::from_codec(codec))
}

/// Decode values with `codec` until the input runs out.
///
/// A trailing fragment too short for one more value ends the stream cleanly.
/// Malformed input is a terminal error.
pub fn many<C>(codec: C) -> StreamDecoder<C::Value>
where
    C: Codec + 'static,
    C::Value: Element,
{
    StreamDecoder::Many(Step::from_codec(codec))
}

/// Like [`many`], but any failed attempt ends the stream cleanly and leaves
/// the bits it looked at unconsumed.
pub fn try_many<C>(codec: C) -> StreamDecoder<C::Value>
where
    C: Codec + 'static,
    C::Value: Element,
{
    StreamDecoder::TryMany(Step::from_codec(codec))
}

impl<T: Element> StreamDecoder<T> {
    pub fn emit(values: impl IntoIterator<Item = T>) -> Self {
        Self::Emit(values.into_iter().collect())
    }

    pub fn emit_one(value: T) -> Self {
        Self::Emit(Arc::from(vec![value]))
    }

    /// A plan that yields nothing and consumes nothing.
    pub fn empty() -> Self {
        Self::Emit(Arc::from(Vec::new()))
    }

    pub fn fail(err: CodecError) -> Self {
        Self::Fail(err)
    }

    /// Confine this plan to the next `bits` bits; unread bits of the region
    /// are discarded when it closes.
    pub fn isolate(self, bits: u64) -> Self {
        Self::Isolate {
            bits,
            inner: Box::new(self),
            strict: false,
        }
    }

    /// Like [`isolate`](Self::isolate), but leftover bits are a `Malformed`
    /// error.
    pub fn strict_isolate(self, bits: u64) -> Self {
        Self::Isolate {
            bits,
            inner: Box::new(self),
            strict: true,
        }
    }

    pub fn flat_map<U, F>(self, f: F) -> StreamDecoder<U>
    where
        U: Element,
        F: Fn(T) -> StreamDecoder<U> + Send + Sync + 'static,
    {
        self.bind(Arc::new(f))
    }

    fn bind<U: Element>(self, f: Continuation<T, U>) -> StreamDecoder<U> {
        StreamDecoder::FlatMap(Arc::new(Bound { inner: self, f }))
    }

    pub fn map<U, F>(self, f: F) -> StreamDecoder<U>
    where
        U: Element,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.flat_map(move |value| StreamDecoder::emit_one(f(value)))
    }

    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::Filter {
            inner: Box::new(self),
            predicate: Arc::new(predicate),
        }
    }

    /// Run `self`, then `next` on whatever input remains.
    pub fn append(self, next: StreamDecoder<T>) -> Self {
        Self::Append(Box::new(self), Box::new(next))
    }

    /// Run this plan until an iteration neither consumes input nor yields
    /// a value.
    pub fn repeat(self) -> Self {
        Self::Repeat {
            inner: Box::new(self),
            times: None,
        }
    }

    /// Run this plan `times` times, stopping early on an iteration that
    /// makes no progress.
    pub fn repeat_n(self, times: u64) -> Self {
        Self::Repeat {
            inner: Box::new(self),
            times: Some(times),
        }
    }
}
