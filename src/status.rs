// ── Native status codes ───────────────────────────────────────────────────────
//
// The registry API reports every outcome as a Win32 error code.  `Status`
// carries that raw code; only the codes the value-access protocol reacts to
// get named constants.  Everything else passes through untouched.

use std::fmt;

/// A raw Win32 status code as returned by a registry call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u32);

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const FILE_NOT_FOUND: Status = Status(2);
    pub const PATH_NOT_FOUND: Status = Status(3);
    pub const INVALID_HANDLE: Status = Status(6);
    pub const NOT_ENOUGH_MEMORY: Status = Status(8);
    pub const INVALID_DATA: Status = Status(13);
    pub const OUTOFMEMORY: Status = Status(14);
    pub const INVALID_PARAMETER: Status = Status(87);
    /// The destination was too small; the call reported the size it needs.
    pub const MORE_DATA: Status = Status(234);
    /// Enumeration ran past the last entry.
    pub const NO_MORE_ITEMS: Status = Status(259);
    pub const KEY_DELETED: Status = Status(1018);
    /// The stored value's type is outside the requested read flags.
    pub const UNSUPPORTED_TYPE: Status = Status(1630);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    pub fn is_not_found(self) -> bool {
        self == Self::FILE_NOT_FOUND || self == Self::PATH_NOT_FOUND
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
