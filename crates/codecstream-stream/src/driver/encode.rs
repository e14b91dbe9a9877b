use std::collections::VecDeque;

use codecstream_bits::BitVector;
use codecstream_codec::Codec;
use tracing::{debug, trace};

use crate::driver::Progress;
use crate::encoder::StreamEncoder;
use crate::error::Result;

/// Interprets a [`StreamEncoder`] over values pushed by the caller.
///
/// Each `Ready` output is the encoding of one value or one emitted constant.
/// A value is only taken from the queue when a node asks for one, so input
/// left over when the plan completes stays queued.
pub struct EncodeSession<T> {
    frames: Vec<StreamEncoder<T>>,
    pending: VecDeque<T>,
    input_done: bool,
    finished: bool,
}

impl<T> EncodeSession<T> {
    pub fn new(plan: StreamEncoder<T>) -> Self {
        Self {
            frames: vec![plan],
            pending: VecDeque::new(),
            input_done: false,
            finished: false,
        }
    }

    pub fn push_value(&mut self, value: T) {
        if !self.input_done && !self.finished {
            self.pending.push_back(value);
        }
    }

    pub fn end_of_input(&mut self) {
        self.input_done = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Values queued but not yet taken by the plan.
    pub fn pending_values(&self) -> usize {
        self.pending.len()
    }

    pub fn abort(&mut self) {
        if !self.finished {
            debug!(pending = self.pending.len(), "encode session aborted");
        }
        self.finished = true;
        self.frames.clear();
        self.pending.clear();
    }

    /// Advance until a chunk is ready, another value is needed, or the plan
    /// completes. An error ends the session.
    pub fn step(&mut self) -> Result<Progress<BitVector>> {
        if self.finished {
            return Ok(Progress::Done);
        }
        while let Some(plan) = self.frames.pop() {
            match plan {
                StreamEncoder::Emit(bits) => return Ok(Progress::Ready(bits)),
                StreamEncoder::Concatenate(first, second) => {
                    self.frames.push(*second);
                    self.frames.push(*first);
                }
                StreamEncoder::Once(codec) => match self.pending.pop_front() {
                    Some(value) => return self.encode(&*codec, &value),
                    None if !self.input_done => return self.wait(StreamEncoder::Once(codec)),
                    None => trace!("once: no value to encode"),
                },
                StreamEncoder::Many(codec) => match self.pending.pop_front() {
                    Some(value) => {
                        let progress = self.encode(&*codec, &value)?;
                        self.frames.push(StreamEncoder::Many(codec));
                        return Ok(progress);
                    }
                    None if !self.input_done => return self.wait(StreamEncoder::Many(codec)),
                    None => trace!("many: input exhausted"),
                },
                StreamEncoder::TryOnce(codec) => match self.pending.pop_front() {
                    Some(value) => match codec.encode(&value) {
                        Ok(bits) => return Ok(Progress::Ready(bits)),
                        Err(err) => {
                            trace!(error = %err, "try_once: value left for next stage");
                            self.pending.push_front(value);
                        }
                    },
                    None if !self.input_done => return self.wait(StreamEncoder::TryOnce(codec)),
                    None => trace!("try_once: no value to encode"),
                },
            }
        }
        self.finished = true;
        debug!(unused = self.pending.len(), "encode session complete");
        Ok(Progress::Done)
    }

    fn encode(
        &mut self,
        codec: &dyn Codec<Value = T>,
        value: &T,
    ) -> Result<Progress<BitVector>> {
        match codec.encode(value) {
            Ok(bits) => Ok(Progress::Ready(bits)),
            Err(err) => {
                debug!(error = %err, "encode session failed");
                self.abort();
                Err(err.into())
            }
        }
    }

    fn wait(&mut self, plan: StreamEncoder<T>) -> Result<Progress<BitVector>> {
        self.frames.push(plan);
        Ok(Progress::NeedInput)
    }
}
