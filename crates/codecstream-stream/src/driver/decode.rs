use std::sync::Arc;

use codecstream_bits::BitVector;
use codecstream_codec::CodecError;
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::decoder::{Element, Step, StreamDecoder};
use crate::driver::{DecodeOutcome, Progress};
use crate::error::{Result, StreamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Once,
    Many,
    TryMany,
}

impl Mode {
    fn name(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Many => "many",
            Self::TryMany => "try_many",
        }
    }

    fn rebuild<T>(self, step: Step<T>) -> StreamDecoder<T> {
        match self {
            Self::Once => StreamDecoder::Once(step),
            Self::Many => StreamDecoder::Many(step),
            Self::TryMany => StreamDecoder::TryMany(step),
        }
    }
}

enum Frame<T> {
    Plan(StreamDecoder<T>),
    Emit {
        values: Arc<[T]>,
        next: usize,
    },
    CloseIsolate {
        bits: u64,
        strict: bool,
    },
    Repeat {
        inner: StreamDecoder<T>,
        remaining: Option<u64>,
        /// Progress counters when the current iteration began.
        started: Option<(u64, u64)>,
    },
}

/// An open isolate region and the continuations waiting for it to close.
struct Region<T> {
    bits: BitVector,
    deferred: Vec<StreamDecoder<T>>,
}

/// Interprets a [`StreamDecoder`] over input pushed by the caller.
///
/// The session owns the residual (bits received but not yet consumed) and a
/// stack of isolate regions. Only the top-level residual grows as chunks
/// arrive; an isolate region is closed from the moment it is entered, so a
/// step that runs past its end fails instead of waiting for input. Plans
/// chained after a region with `flat_map` are held until it closes and then
/// run on the bits that follow it.
///
/// ```
/// use codecstream_bits::BitVector;
/// use codecstream_codec::codecs::uint8;
/// use codecstream_stream::{many, DecodeSession, Progress};
///
/// let mut session = DecodeSession::new(many(uint8()));
/// assert_eq!(session.step().unwrap(), Progress::NeedInput);
/// session.push_chunk(BitVector::from_bytes(vec![7]));
/// assert_eq!(session.step().unwrap(), Progress::Ready(7));
/// session.end_of_input();
/// assert_eq!(session.step().unwrap(), Progress::Done);
/// ```
pub struct DecodeSession<T> {
    frames: Vec<Frame<T>>,
    residual: BitVector,
    isolated: Vec<Region<T>>,
    source_done: bool,
    finished: bool,
    config: SessionConfig,
    /// Top-level bits taken by the plan; a region counts once, on entry.
    consumed: u64,
    /// Bits taken at any depth. Only compared for change.
    advanced: u64,
    emitted: u64,
}

impl<T: Element> DecodeSession<T> {
    pub fn new(plan: StreamDecoder<T>) -> Self {
        Self::with_config(plan, SessionConfig::default())
    }

    pub fn with_config(plan: StreamDecoder<T>, config: SessionConfig) -> Self {
        Self {
            frames: vec![Frame::Plan(plan)],
            residual: BitVector::empty(),
            isolated: Vec::new(),
            source_done: false,
            finished: false,
            config,
            consumed: 0,
            advanced: 0,
            emitted: 0,
        }
    }

    /// Append a chunk to the residual. Empty chunks are ignored, as is
    /// anything pushed after [`end_of_input`](Self::end_of_input).
    pub fn push_chunk(&mut self, chunk: BitVector) {
        if chunk.is_empty() || self.source_done || self.finished {
            return;
        }
        trace!(bits = chunk.len(), buffered = self.residual.len(), "chunk received");
        self.residual = if self.residual.is_empty() {
            chunk
        } else {
            self.residual.concat(&chunk)
        };
    }

    /// Declare that no more chunks will arrive.
    pub fn end_of_input(&mut self) {
        if !self.source_done {
            trace!(buffered = self.residual.len(), "input ended");
            self.source_done = true;
        }
    }

    pub fn is_input_done(&self) -> bool {
        self.source_done
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bits received but not consumed by the plan so far.
    pub fn residual_bits(&self) -> u64 {
        self.residual.len()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Stop the session and drop all pending work.
    pub fn abort(&mut self) {
        if !self.finished {
            debug!(buffered = self.residual.len(), "decode session aborted");
        }
        self.finished = true;
        self.frames.clear();
        self.isolated.clear();
        self.residual = BitVector::empty();
    }

    /// Top-level bits consumed so far. An isolate region counts in full
    /// when it is entered, whatever its inner plan reads.
    pub fn consumed_bits(&self) -> u64 {
        self.consumed
    }

    /// Consume the session, returning the unconsumed top-level bits.
    pub fn finish(self) -> BitVector {
        self.residual
    }

    /// Advance until a value is ready, more input is needed, or the plan
    /// completes.
    ///
    /// An error ends the session; later calls return `Done`.
    pub fn step(&mut self) -> Result<Progress<T>> {
        if self.finished {
            return Ok(Progress::Done);
        }
        match self.advance() {
            Ok(Progress::NeedInput) => {
                let buffered = self.residual.len();
                if buffered > self.config.max_buffered_bits {
                    self.abort();
                    return Err(StreamError::BufferLimit {
                        buffered,
                        max: self.config.max_buffered_bits,
                    });
                }
                Ok(Progress::NeedInput)
            }
            Ok(Progress::Done) => {
                self.finished = true;
                if !self.residual.is_empty() {
                    debug!(bits = self.residual.len(), "discarding trailing bits");
                }
                debug!(
                    consumed = self.consumed,
                    emitted = self.emitted,
                    "decode session complete"
                );
                Ok(Progress::Done)
            }
            Ok(ready) => Ok(ready),
            Err(err) => {
                debug!(error = %err, "decode session failed");
                self.abort();
                Err(err.into())
            }
        }
    }

    fn advance(&mut self) -> std::result::Result<Progress<T>, CodecError> {
        while let Some(frame) = self.frames.pop() {
            match frame {
                Frame::Plan(plan) => {
                    if let Some(progress) = self.interpret(plan)? {
                        return Ok(progress);
                    }
                }
                Frame::Emit { values, next } => {
                    let Some(value) = values.get(next).cloned() else {
                        continue;
                    };
                    if next + 1 < values.len() {
                        self.frames.push(Frame::Emit {
                            values,
                            next: next + 1,
                        });
                    }
                    self.emitted += 1;
                    return Ok(Progress::Ready(value));
                }
                Frame::CloseIsolate { bits, strict } => {
                    let Some(region) = self.isolated.pop() else {
                        continue;
                    };
                    let leftover = region.bits.len();
                    debug!(
                        bits,
                        leftover,
                        strict,
                        deferred = region.deferred.len(),
                        "isolate closed"
                    );
                    if strict && leftover > 0 {
                        return Err(CodecError::malformed(format!(
                            "{leftover} bits left over after strict isolate of {bits} bits"
                        )));
                    }
                    for plan in region.deferred.into_iter().rev() {
                        self.frames.push(Frame::Plan(plan));
                    }
                }
                Frame::Repeat {
                    inner,
                    remaining,
                    started,
                } => {
                    if started == Some((self.advanced, self.emitted)) {
                        trace!("repeat made no progress");
                        continue;
                    }
                    let remaining = match remaining {
                        Some(0) => continue,
                        Some(n) => Some(n - 1),
                        None => None,
                    };
                    self.frames.push(Frame::Repeat {
                        inner: inner.clone(),
                        remaining,
                        started: Some((self.advanced, self.emitted)),
                    });
                    self.frames.push(Frame::Plan(inner));
                }
            }
        }
        Ok(Progress::Done)
    }

    /// Expand one plan node. `Some` means the step loop must return.
    fn interpret(
        &mut self,
        plan: StreamDecoder<T>,
    ) -> std::result::Result<Option<Progress<T>>, CodecError> {
        match plan {
            StreamDecoder::Emit(values) => {
                if !values.is_empty() {
                    self.frames.push(Frame::Emit { values, next: 0 });
                }
            }
            StreamDecoder::Once(step) => return self.attempt(step, Mode::Once),
            StreamDecoder::Many(step) => return self.attempt(step, Mode::Many),
            StreamDecoder::TryMany(step) => return self.attempt(step, Mode::TryMany),
            StreamDecoder::Isolate {
                bits,
                inner,
                strict,
            } => return self.enter_isolate(bits, *inner, strict),
            StreamDecoder::FlatMap(bind) => self.frames.push(Frame::Plan(bind.expand())),
            StreamDecoder::Filter { inner, predicate } => match *inner {
                StreamDecoder::Emit(values) => {
                    let kept: Arc<[T]> = values
                        .iter()
                        .filter(|value| predicate(*value))
                        .cloned()
                        .collect();
                    if !kept.is_empty() {
                        self.frames.push(Frame::Emit {
                            values: kept,
                            next: 0,
                        });
                    }
                }
                other => {
                    let filtered = other.flat_map(move |value| {
                        if predicate(&value) {
                            StreamDecoder::emit_one(value)
                        } else {
                            StreamDecoder::empty()
                        }
                    });
                    self.frames.push(Frame::Plan(filtered));
                }
            },
            StreamDecoder::Append(first, second) => {
                self.frames.push(Frame::Plan(*second));
                self.frames.push(Frame::Plan(*first));
            }
            StreamDecoder::Repeat { inner, times } => self.frames.push(Frame::Repeat {
                inner: *inner,
                remaining: times,
                started: None,
            }),
            StreamDecoder::Fail(err) => return Err(err),
            StreamDecoder::Deferred(inner) => match self.isolated.last_mut() {
                Some(region) => region.deferred.push(*inner),
                None => self.frames.push(Frame::Plan(*inner)),
            },
        }
        Ok(None)
    }

    fn attempt(
        &mut self,
        step: Step<T>,
        mode: Mode,
    ) -> std::result::Result<Option<Progress<T>>, CodecError> {
        let input = self.input().clone();
        let open = self.scope_open();
        match step.attempt(&input) {
            DecodeOutcome::Produced {
                value: next,
                consumed,
            } => {
                trace!(mode = mode.name(), bits = consumed, "step decoded");
                self.advanced += consumed;
                if self.isolated.is_empty() {
                    self.consumed += consumed;
                }
                self.set_input(input.drop(consumed));
                if mode != Mode::Once && consumed > 0 {
                    self.frames.push(Frame::Plan(mode.rebuild(step)));
                }
                self.frames.push(Frame::Plan(next));
                Ok(None)
            }
            DecodeOutcome::Exhausted if open => self.wait(mode.rebuild(step)),
            DecodeOutcome::Exhausted => {
                trace!(mode = mode.name(), "scope exhausted");
                Ok(None)
            }
            DecodeOutcome::Failed(err) if err.is_insufficient() && open => {
                self.wait(mode.rebuild(step))
            }
            DecodeOutcome::Failed(err) => match mode {
                Mode::Once => Err(err),
                Mode::Many if !err.is_insufficient() => Err(err),
                Mode::Many | Mode::TryMany => {
                    trace!(
                        mode = mode.name(),
                        left = input.len(),
                        error = %err,
                        "stopping at unreadable input"
                    );
                    Ok(None)
                }
            },
        }
    }

    fn enter_isolate(
        &mut self,
        bits: u64,
        inner: StreamDecoder<T>,
        strict: bool,
    ) -> std::result::Result<Option<Progress<T>>, CodecError> {
        let input = self.input().clone();
        if input.len() >= bits {
            let (region, rest) = input.split_at(bits);
            if self.isolated.is_empty() {
                self.consumed += bits;
            }
            self.advanced += bits;
            self.set_input(rest);
            self.isolated.push(Region {
                bits: region,
                deferred: Vec::new(),
            });
            debug!(bits, strict, depth = self.isolated.len(), "isolate opened");
            self.frames.push(Frame::CloseIsolate { bits, strict });
            self.frames.push(Frame::Plan(inner));
            return Ok(None);
        }
        if self.scope_open() {
            return self.wait(StreamDecoder::Isolate {
                bits,
                inner: Box::new(inner),
                strict,
            });
        }
        if input.is_empty() {
            trace!(bits, "isolate skipped at end of scope");
            return Ok(None);
        }
        Err(CodecError::insufficient(bits, input.len()))
    }

    fn wait(
        &mut self,
        plan: StreamDecoder<T>,
    ) -> std::result::Result<Option<Progress<T>>, CodecError> {
        self.frames.push(Frame::Plan(plan));
        Ok(Some(Progress::NeedInput))
    }

    fn input(&self) -> &BitVector {
        self.isolated
            .last()
            .map_or(&self.residual, |region| &region.bits)
    }

    fn set_input(&mut self, bits: BitVector) {
        match self.isolated.last_mut() {
            Some(region) => region.bits = bits,
            None => self.residual = bits,
        }
    }

    /// Only the top-level scope can still grow.
    fn scope_open(&self) -> bool {
        self.isolated.is_empty() && !self.source_done
    }
}

impl<T: Element> StreamDecoder<T> {
    /// Decode every value this plan yields from one in-memory region.
    pub fn decode_all(&self, bits: BitVector) -> Result<Vec<T>> {
        let mut session = DecodeSession::new(self.clone());
        session.push_chunk(bits);
        session.end_of_input();
        let mut values = Vec::new();
        loop {
            match session.step()? {
                Progress::Ready(value) => values.push(value),
                Progress::Done | Progress::NeedInput => return Ok(values),
            }
        }
    }
}
