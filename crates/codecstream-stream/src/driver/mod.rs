//! Sans-io interpreters for decoder and encoder plans.
//!
//! A session never performs I/O. Callers feed it input (`push_chunk`,
//! `push_value`), mark the end of input, and call `step` until it reports
//! [`Progress::Done`]. The sync and async adapters are thin loops around
//! these sessions.

mod decode;
mod encode;

pub use decode::DecodeSession;
pub use encode::EncodeSession;

use codecstream_codec::CodecError;

/// Result of advancing a session by one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress<T> {
    /// The next output is ready.
    Ready(T),
    /// The session cannot continue until more input arrives or input ends.
    NeedInput,
    /// The plan is complete; further steps keep returning `Done`.
    Done,
}

/// Classified result of one decode attempt against a scope's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome<T> {
    Produced { value: T, consumed: u64 },
    /// The scope held no bits at all.
    Exhausted,
    Failed(CodecError),
}
