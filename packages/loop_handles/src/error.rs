//! The uniform error channel shared by every handle kind.

use thiserror::Error;

use crate::engine::EngineStatus;

/// Well-known engine error codes, errno-flavored negatives as the native
/// engine defines them. The catalogue is not exhaustive; any negative value
/// is a valid code and unknown ones translate to a generic description.
pub mod code {
    use super::EngineStatus;

    /// Operation not permitted.
    pub const EPERM: EngineStatus = -1;
    /// No such file or directory.
    pub const ENOENT: EngineStatus = -2;
    /// Interrupted system call.
    pub const EINTR: EngineStatus = -4;
    /// Input/output error.
    pub const EIO: EngineStatus = -5;
    /// Bad file descriptor.
    pub const EBADF: EngineStatus = -9;
    /// Resource temporarily unavailable.
    pub const EAGAIN: EngineStatus = -11;
    /// Resource busy or locked.
    pub const EBUSY: EngineStatus = -16;
    /// Invalid argument.
    pub const EINVAL: EngineStatus = -22;
    /// Function not implemented.
    pub const ENOSYS: EngineStatus = -38;
    /// Address already in use.
    pub const EADDRINUSE: EngineStatus = -98;
    /// Operation canceled.
    pub const ECANCELED: EngineStatus = -125;
}

/// One engine-reported failure, published on the emitter of the handle the
/// failure concerns.
///
/// Every handle kind surfaces operational failures through this one event
/// type, so generic error handling attaches a single listener shape
/// regardless of the concrete kind.
///
/// A code of zero is the "no error" sentinel; [`is_err`][Self::is_err] is
/// `false` only for that value.
///
/// # Example
///
/// ```rust
/// use loop_handles::{ErrorEvent, code};
///
/// let event = ErrorEvent::new(code::EADDRINUSE);
///
/// assert!(event.is_err());
/// assert_eq!(event.name(), "EADDRINUSE");
/// assert_eq!(event.to_string(), "EADDRINUSE: address already in use");
///
/// assert!(!ErrorEvent::new(0).is_err());
/// ```
#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
#[error("{}: {}", self.name(), self.message())]
pub struct ErrorEvent {
    code: EngineStatus,
}

impl ErrorEvent {
    /// Wraps an engine status code.
    #[must_use]
    pub fn new(code: EngineStatus) -> Self {
        Self { code }
    }

    /// The engine's status code, unchanged.
    #[must_use]
    pub fn code(self) -> EngineStatus {
        self.code
    }

    /// Whether this event carries an actual error (any nonzero code).
    #[must_use]
    pub fn is_err(self) -> bool {
        self.code != 0
    }

    /// Short upper-case identifier of the code, `"UNKNOWN"` for codes
    /// outside the known catalogue. Pure: repeated calls for the same code
    /// return the same value.
    #[must_use]
    pub fn name(self) -> &'static str {
        translate(self.code).0
    }

    /// Human-readable description of the code, `"unknown error"` for codes
    /// outside the known catalogue. Pure like [`name`][Self::name].
    #[must_use]
    pub fn message(self) -> &'static str {
        translate(self.code).1
    }
}

/// Code-to-description lookup. Total: every input maps to something, with the
/// generic fallback for codes the catalogue does not know.
fn translate(status: EngineStatus) -> (&'static str, &'static str) {
    match status {
        0 => ("OK", "no error"),
        code::EPERM => ("EPERM", "operation not permitted"),
        code::ENOENT => ("ENOENT", "no such file or directory"),
        code::EINTR => ("EINTR", "interrupted system call"),
        code::EIO => ("EIO", "input/output error"),
        code::EBADF => ("EBADF", "bad file descriptor"),
        code::EAGAIN => ("EAGAIN", "resource temporarily unavailable"),
        code::EBUSY => ("EBUSY", "resource busy or locked"),
        code::EINVAL => ("EINVAL", "invalid argument"),
        code::ENOSYS => ("ENOSYS", "function not implemented"),
        code::EADDRINUSE => ("EADDRINUSE", "address already in use"),
        code::ECANCELED => ("ECANCELED", "operation canceled"),
        _ => ("UNKNOWN", "unknown error"),
    }
}
