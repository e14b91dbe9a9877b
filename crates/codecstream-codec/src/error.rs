use std::fmt;

/// Context segments naming where inside a composite value a failure happened.
///
/// Displays as `outer/inner: ` so it can prefix an error message, or as
/// nothing when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPath(Vec<String>);

impl ErrorPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push_front(&mut self, segment: String) {
        self.0.insert(0, segment);
    }
}

impl fmt::Display for ErrorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, "{}: ", self.0.join("/"))
    }
}

/// Errors reported by a codec while decoding or encoding one value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The step needed more bits than its scope holds.
    #[error("{path}insufficient input (needed {needed} bits, have {available})")]
    InsufficientInput {
        needed: u64,
        available: u64,
        path: ErrorPath,
    },

    /// The bits were present but rejected on structural or semantic grounds.
    #[error("{path}{message}")]
    Malformed { message: String, path: ErrorPath },
}

impl CodecError {
    pub fn insufficient(needed: u64, available: u64) -> Self {
        Self::InsufficientInput {
            needed,
            available,
            path: ErrorPath::default(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            path: ErrorPath::default(),
        }
    }

    /// True for [`CodecError::InsufficientInput`].
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Self::InsufficientInput { .. })
    }

    pub fn path(&self) -> &ErrorPath {
        match self {
            Self::InsufficientInput { path, .. } | Self::Malformed { path, .. } => path,
        }
    }

    /// Prefix the error path with `segment`.
    pub fn push_context(mut self, segment: impl Into<String>) -> Self {
        match &mut self {
            Self::InsufficientInput { path, .. } | Self::Malformed { path, .. } => {
                path.push_front(segment.into())
            }
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_display() {
        let err = CodecError::insufficient(32, 8);
        assert_eq!(
            err.to_string(),
            "insufficient input (needed 32 bits, have 8)"
        );
        assert!(err.is_insufficient());
    }

    #[test]
    fn context_prefixes_path() {
        let err = CodecError::malformed("bad tag")
            .push_context("payload")
            .push_context("record");
        assert_eq!(err.to_string(), "record/payload: bad tag");
        assert_eq!(err.path().segments(), ["record", "payload"]);
        assert!(!err.is_insufficient());
    }
}
