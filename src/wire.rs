// ── Wire types and read flags ─────────────────────────────────────────────────
//
// `WireType` is the on-disk tag of a value (REG_*).  `ReadFlags` is what a
// read asks the store to accept (RRF_RT_* plus modifiers).  The store compares
// the two and answers UNSUPPORTED_TYPE on a mismatch; nothing here coerces.

use std::ops::BitOr;

/// On-disk encoding of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// REG_NONE.
    None,
    /// REG_SZ: null-terminated string.
    String,
    /// REG_EXPAND_SZ: string with `%VAR%` placeholders.
    ExpandString,
    /// REG_BINARY.
    Binary,
    /// REG_DWORD: little-endian 32-bit integer.
    Dword,
    /// REG_MULTI_SZ: null-delimited, double-null-terminated list.
    MultiString,
    /// REG_QWORD: little-endian 64-bit integer.
    Qword,
    /// Any other raw REG_* value (REG_LINK, resource lists, …).
    Other(u32),
}

impl WireType {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::String,
            2 => Self::ExpandString,
            3 => Self::Binary,
            4 => Self::Dword,
            7 => Self::MultiString,
            11 => Self::Qword,
            other => Self::Other(other),
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::String => 1,
            Self::ExpandString => 2,
            Self::Binary => 3,
            Self::Dword => 4,
            Self::MultiString => 7,
            Self::Qword => 11,
            Self::Other(raw) => raw,
        }
    }

    /// String-shaped payloads carry a trailing terminator on the wire.
    pub fn is_string(self) -> bool {
        matches!(self, Self::String | Self::ExpandString | Self::MultiString)
    }
}

/// RRF_* flags passed to a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadFlags(pub u32);

impl ReadFlags {
    pub const RT_REG_NONE: ReadFlags = ReadFlags(0x0000_0001);
    pub const RT_REG_SZ: ReadFlags = ReadFlags(0x0000_0002);
    pub const RT_REG_EXPAND_SZ: ReadFlags = ReadFlags(0x0000_0004);
    pub const RT_REG_BINARY: ReadFlags = ReadFlags(0x0000_0008);
    pub const RT_REG_DWORD: ReadFlags = ReadFlags(0x0000_0010);
    pub const RT_REG_MULTI_SZ: ReadFlags = ReadFlags(0x0000_0020);
    pub const RT_REG_QWORD: ReadFlags = ReadFlags(0x0000_0040);
    pub const RT_ANY: ReadFlags = ReadFlags(0x0000_FFFF);
    /// Return REG_EXPAND_SZ data verbatim instead of expanding it.
    pub const NOEXPAND: ReadFlags = ReadFlags(0x1000_0000);

    /// Flags a read of `wire_type` passes to the store.
    ///
    /// Types without a dedicated mapping pass their raw value through
    /// unmodified, so advanced callers can hand-build a flag set.
    pub fn for_wire_type(wire_type: WireType) -> Self {
        match wire_type {
            WireType::Dword => Self::RT_REG_DWORD,
            WireType::Qword => Self::RT_REG_QWORD,
            WireType::String => Self::RT_REG_SZ | Self::RT_REG_EXPAND_SZ | Self::NOEXPAND,
            WireType::ExpandString => Self::RT_REG_SZ | Self::RT_REG_EXPAND_SZ,
            WireType::MultiString => Self::RT_REG_MULTI_SZ,
            WireType::Binary => Self::RT_REG_BINARY,
            other => Self(other.as_raw()),
        }
    }

    pub fn contains(self, other: ReadFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether a stored value of `wire_type` satisfies these flags.
    pub fn accepts(self, wire_type: WireType) -> bool {
        let bit = match wire_type {
            WireType::None => Self::RT_REG_NONE,
            WireType::String => Self::RT_REG_SZ,
            WireType::ExpandString => Self::RT_REG_EXPAND_SZ,
            WireType::Binary => Self::RT_REG_BINARY,
            WireType::Dword => Self::RT_REG_DWORD,
            WireType::MultiString => Self::RT_REG_MULTI_SZ,
            WireType::Qword => Self::RT_REG_QWORD,
            WireType::Other(_) => return self.contains(Self::RT_ANY),
        };
        self.contains(bit)
    }
}

impl BitOr for ReadFlags {
    type Output = ReadFlags;

    fn bitor(self, rhs: ReadFlags) -> ReadFlags {
        ReadFlags(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_flag_mapping_is_bit_exact() {
        assert_eq!(ReadFlags::for_wire_type(WireType::Dword).0, 0x10);
        assert_eq!(ReadFlags::for_wire_type(WireType::Qword).0, 0x40);
        assert_eq!(ReadFlags::for_wire_type(WireType::String).0, 0x1000_0006);
        assert_eq!(ReadFlags::for_wire_type(WireType::ExpandString).0, 0x6);
        assert_eq!(ReadFlags::for_wire_type(WireType::MultiString).0, 0x20);
        assert_eq!(ReadFlags::for_wire_type(WireType::Binary).0, 0x8);
    }

    #[test]
    fn unmapped_types_pass_through() {
        assert_eq!(ReadFlags::for_wire_type(WireType::Other(0xFFFF)), ReadFlags::RT_ANY);
        assert_eq!(ReadFlags::for_wire_type(WireType::None).0, 0);
    }

    #[test]
    fn string_read_accepts_both_string_types() {
        let f = ReadFlags::for_wire_type(WireType::String);
        assert!(f.accepts(WireType::String));
        assert!(f.accepts(WireType::ExpandString));
        assert!(!f.accepts(WireType::MultiString));
        assert!(!f.accepts(WireType::Dword));
    }

    #[test]
    fn raw_round_trip_for_named_types() {
        for raw in [0, 1, 2, 3, 4, 7, 11, 6, 8] {
            assert_eq!(WireType::from_raw(raw).as_raw(), raw);
        }
        assert_eq!(WireType::from_raw(6), WireType::Other(6));
    }
}
