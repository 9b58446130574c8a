// ── Error-signal policy ───────────────────────────────────────────────────────
//
// Every engine function reports failures through a `&dyn ErrorSignal` instead
// of deciding for itself.  The same negotiation, codec, and cursor code then
// serves three reporting styles:
//   • ReturnCode – the error comes back as `Err(RegError)`.
//   • Panic      – the error unwinds as a `RegError` panic payload.
//   • Abort      – the error is logged and the process terminates.
//
// Custom strategies (e.g. one that logs and then returns) implement the trait
// directly and are handed to `Registry::with_signal`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::{RegError, Result},
    status::Status,
};

/// Strategy that turns a failure into the caller-visible outcome.
pub trait ErrorSignal: Send + Sync + fmt::Debug {
    /// Report `err`.  Returns the error for the caller to propagate, or
    /// diverges (unwinds or terminates) without returning.
    fn signal(&self, err: RegError) -> RegError;

    /// Translate a native status; success maps to `success()`.
    fn from_status(&self, status: Status, function: &'static str) -> Result<()> {
        if status.is_success() {
            self.success()
        } else {
            Err(self.signal(RegError::from_status(status, function)))
        }
    }

    fn success(&self) -> Result<()> {
        Ok(())
    }
}

/// The stock strategies, selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    #[default]
    ReturnCode,
    Panic,
    Abort,
}

impl ErrorSignal for ErrorPolicy {
    fn signal(&self, err: RegError) -> RegError {
        match self {
            Self::ReturnCode => err,
            Self::Panic => {
                tracing::warn!(error = %err, "raising registry error");
                std::panic::panic_any(err)
            }
            Self::Abort => {
                tracing::error!(error = %err, "fatal registry error, aborting");
                std::process::abort()
            }
        }
    }
}

/// Lets NotFound come back as a plain `Err` so `try_` reads can turn it into
/// `None`; every other error goes through the wrapped strategy.
#[derive(Debug)]
pub(crate) struct TolerateNotFound<'a>(pub(crate) &'a dyn ErrorSignal);

impl ErrorSignal for TolerateNotFound<'_> {
    fn signal(&self, err: RegError) -> RegError {
        if err.is_not_found() {
            err
        } else {
            self.0.signal(err)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn return_code_passes_error_through() {
        let r = ErrorPolicy::ReturnCode.from_status(Status::KEY_DELETED, "RegGetValueW");
        assert_eq!(r.unwrap_err().code(), Status::KEY_DELETED);
    }

    #[test]
    fn success_is_ok_for_every_policy() {
        for p in [ErrorPolicy::ReturnCode, ErrorPolicy::Panic, ErrorPolicy::Abort] {
            assert!(p.success().is_ok());
            assert!(p.from_status(Status::SUCCESS, "RegSetValueExW").is_ok());
        }
    }

    #[test]
    fn panic_policy_unwinds_with_the_error() {
        let caught = catch_unwind(AssertUnwindSafe(|| {
            let _ = ErrorPolicy::Panic.from_status(Status::UNSUPPORTED_TYPE, "RegGetValueW");
        }))
        .expect_err("policy must unwind");
        let err = caught.downcast::<RegError>().expect("payload is RegError");
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    }

    #[test]
    fn tolerate_not_found_skips_the_panic() {
        let inner = ErrorPolicy::Panic;
        let tolerant = TolerateNotFound(&inner);
        let r = tolerant.from_status(Status::FILE_NOT_FOUND, "RegGetValueW");
        assert!(r.unwrap_err().is_not_found());

        let caught = catch_unwind(AssertUnwindSafe(|| {
            let _ = tolerant.from_status(Status(5), "RegGetValueW");
        }));
        assert!(caught.is_err());
    }

    #[test]
    fn policy_deserializes_from_snake_case() {
        let p: ErrorPolicy = serde_json::from_str("\"abort\"").expect("deserialize");
        assert_eq!(p, ErrorPolicy::Abort);
        let p: ErrorPolicy = serde_json::from_str("\"return_code\"").expect("deserialize");
        assert_eq!(p, ErrorPolicy::ReturnCode);
    }
}
