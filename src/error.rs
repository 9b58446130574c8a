// ── Central error type ────────────────────────────────────────────────────────
//
// All fallible operations in regkit return `error::Result<T>`.  How an error
// reaches the caller (returned, unwound, or fatal) is decided by the active
// `signal::ErrorSignal`; this module only defines what the errors are.

use crate::status::Status;

/// Every error that a registry value operation can produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegError {
    /// No value or key exists under the requested name.
    #[error("{function}: value or key not found (error {code})")]
    NotFound {
        /// The name of the failing function, for display purposes.
        function: &'static str,
        /// FILE_NOT_FOUND or PATH_NOT_FOUND.
        code: Status,
    },

    /// The destination cannot grow and the value does not fit.
    ///
    /// Never escapes a read into a growable buffer.
    #[error("buffer too small: {required} bytes required, {capacity} available")]
    BufferTooSmall {
        /// Exact byte count the store reported for the value.
        required: usize,
        /// Byte capacity of the destination at the time of the call.
        capacity: usize,
    },

    /// The stored wire type is outside the set the read accepts.
    #[error("{function}: stored value type does not match the requested type")]
    UnsupportedType { function: &'static str },

    /// An allocation failed, here or inside the store.
    #[error("out of memory allocating {requested} bytes (error {code})")]
    OutOfMemory {
        /// Bytes asked for; zero when the store gave no size.
        requested: usize,
        /// NOT_ENOUGH_MEMORY for local failures, otherwise the store's code.
        code: Status,
    },

    /// Cursor overflow, advancing an end cursor, or a malformed multi-string.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Any other failure reported by the store, with the original code.
    #[error("{function} failed (error {code})")]
    Os { function: &'static str, code: Status },
}

/// Fieldless mirror of `RegError` for matching on the category alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BufferTooSmall,
    UnsupportedType,
    OutOfMemory,
    InvalidArgument,
    Os,
}

impl RegError {
    /// Translate a non-success status into the error taxonomy.
    ///
    /// MORE_DATA has no size attached here; the negotiation engine builds
    /// `BufferTooSmall` itself when it knows the reported size.
    pub fn from_status(code: Status, function: &'static str) -> Self {
        match code {
            Status::FILE_NOT_FOUND | Status::PATH_NOT_FOUND => Self::NotFound { function, code },
            Status::UNSUPPORTED_TYPE => Self::UnsupportedType { function },
            Status::MORE_DATA => Self::BufferTooSmall {
                required: 0,
                capacity: 0,
            },
            Status::NOT_ENOUGH_MEMORY | Status::OUTOFMEMORY => {
                Self::OutOfMemory { requested: 0, code }
            }
            Status::INVALID_PARAMETER => Self::InvalidArgument("rejected by the store"),
            _ => Self::Os { function, code },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Os { .. } => ErrorKind::Os,
        }
    }

    /// The Win32 code this error corresponds to.
    pub fn code(&self) -> Status {
        match self {
            Self::NotFound { code, .. }
            | Self::Os { code, .. }
            | Self::OutOfMemory { code, .. } => *code,
            Self::BufferTooSmall { .. } => Status::MORE_DATA,
            Self::UnsupportedType { .. } => Status::UNSUPPORTED_TYPE,
            Self::InvalidArgument(_) => Status::INVALID_PARAMETER,
        }
    }

    /// A local allocation of `requested` bytes failed.
    pub fn out_of_memory(requested: usize) -> Self {
        Self::OutOfMemory {
            requested,
            code: Status::NOT_ENOUGH_MEMORY,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RegError>;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_translation_table() {
        let f = "RegGetValueW";
        assert_eq!(
            RegError::from_status(Status::FILE_NOT_FOUND, f).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RegError::from_status(Status::PATH_NOT_FOUND, f).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RegError::from_status(Status::UNSUPPORTED_TYPE, f).kind(),
            ErrorKind::UnsupportedType
        );
        assert_eq!(
            RegError::from_status(Status::MORE_DATA, f).kind(),
            ErrorKind::BufferTooSmall
        );
        assert_eq!(
            RegError::from_status(Status::OUTOFMEMORY, f).kind(),
            ErrorKind::OutOfMemory
        );
        assert_eq!(
            RegError::from_status(Status::KEY_DELETED, f),
            RegError::Os {
                function: f,
                code: Status::KEY_DELETED
            }
        );
    }

    #[test]
    fn passthrough_keeps_original_code() {
        let e = RegError::from_status(Status(5), "RegSetValueExW");
        assert_eq!(e.code(), Status(5));
        assert_eq!(e.to_string(), "RegSetValueExW failed (error 0x00000005)");
    }

    #[test]
    fn store_out_of_memory_keeps_its_code() {
        for code in [Status::NOT_ENOUGH_MEMORY, Status::OUTOFMEMORY] {
            let e = RegError::from_status(code, "RegGetValueW");
            assert_eq!(e.kind(), ErrorKind::OutOfMemory);
            assert_eq!(e.code(), code);
        }
    }

    #[test]
    fn buffer_too_small_message_names_sizes() {
        let e = RegError::BufferTooSmall {
            required: 12,
            capacity: 4,
        };
        assert_eq!(e.to_string(), "buffer too small: 12 bytes required, 4 available");
        assert_eq!(e.code(), Status::MORE_DATA);
    }
}
