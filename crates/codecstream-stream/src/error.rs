use codecstream_codec::CodecError;

/// Errors that end a decode or encode session.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A codec rejected the input or a value.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The upstream chunk source failed.
    #[error("source failed: {0}")]
    Source(Box<dyn std::error::Error + Send + Sync>),

    /// An I/O error occurred while reading chunks or writing encoded bytes.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The residual grew past the configured limit while the plan still
    /// needed more input.
    #[error("residual too large ({buffered} bits buffered, max {max})")]
    BufferLimit { buffered: u64, max: u64 },
}

impl StreamError {
    /// The codec failure behind this error, if any.
    pub fn codec(&self) -> Option<&CodecError> {
        match self {
            Self::Codec(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.codec().is_some_and(CodecError::is_insufficient)
    }

    pub(crate) fn from_source(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Source(err.into())
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
