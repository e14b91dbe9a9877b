/// Default cap on buffered residual bits (64 MiB worth).
pub const DEFAULT_MAX_BUFFERED_BITS: u64 = 64 * 1024 * 1024 * 8;

/// Default number of bytes requested per read from a byte source.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on residual bits held while the plan still needs input.
    pub max_buffered_bits: u64,
    /// Bytes per read for `Read`/`AsyncRead` backed sources.
    pub read_chunk_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_buffered_bits: DEFAULT_MAX_BUFFERED_BITS,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl SessionConfig {
    pub fn with_max_buffered_bits(mut self, bits: u64) -> Self {
        self.max_buffered_bits = bits;
        self
    }

    /// A zero chunk size is bumped to one byte.
    pub fn with_read_chunk_size(mut self, bytes: usize) -> Self {
        self.read_chunk_size = bytes.max(1);
        self
    }
}
