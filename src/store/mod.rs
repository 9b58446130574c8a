// ── Native store seam ─────────────────────────────────────────────────────────
//
// `NativeStore` is the registry API as the engine sees it: one method per OS
// call, each returning the raw status code.  It does no negotiation, retrying,
// or error translation.  That all happens above this line.
//
// Two implementations:
//   • `memory::MemoryStore`     – in-process emulation, every platform.
//   • `platform::win32::Win32Store` – the real registry (Windows only).

pub mod memory;

pub use memory::MemoryStore;

use crate::{status::Status, wire::ReadFlags};

/// Non-owning reference to a node in the store.
///
/// Copying it never duplicates or closes anything; whoever opened the node
/// owns its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub isize);

/// Result of a single value query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetValueOutcome {
    pub status: Status,
    /// Raw REG_* type of the stored value (after any expansion).
    pub raw_type: u32,
    /// Bytes the payload occupies.  On MORE_DATA, the size the caller needs.
    pub data_len: u32,
}

/// Result of a single enumerate-at-index call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumOutcome {
    pub status: Status,
    /// On success: name length in UTF-16 units, terminator excluded.
    /// On MORE_DATA: required buffer length, terminator included.
    pub name_len: u32,
    /// Raw REG_* type of the entry (value enumeration only).
    pub raw_type: u32,
}

/// Counts and maximum lengths reported for a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeInfo {
    pub child_keys: u32,
    pub values: u32,
    /// Longest child key name, UTF-16 units, terminator excluded.
    pub max_key_name_len: u32,
    /// Longest value name, UTF-16 units, terminator excluded.
    pub max_value_name_len: u32,
    /// Largest payload in bytes.
    pub max_data_len: u32,
}

/// The OS calls the value-access protocol drives.
///
/// Names are UTF-16 without a terminator; `None` addresses the node's default
/// value.  Implementations must be usable from several threads at once.
pub trait NativeStore {
    /// Read a value (RegGetValueW).
    ///
    /// `data == None` asks only for the size.  A destination shorter than the
    /// payload receives its first `data.len()` bytes and MORE_DATA.
    fn get_value(
        &self,
        node: NodeRef,
        name: Option<&[u16]>,
        flags: ReadFlags,
        data: Option<&mut [u8]>,
    ) -> GetValueOutcome;

    /// Create or replace a value (RegSetValueExW).
    fn set_value(&self, node: NodeRef, name: Option<&[u16]>, raw_type: u32, data: &[u8])
        -> Status;

    /// Remove a value (RegDeleteValueW).
    fn delete_value(&self, node: NodeRef, name: Option<&[u16]>) -> Status;

    /// Name of the child key at `index` (RegEnumKeyExW).
    fn enum_key(&self, node: NodeRef, index: u32, name: &mut [u16]) -> EnumOutcome;

    /// Name and type of the value at `index` (RegEnumValueW).
    fn enum_value(&self, node: NodeRef, index: u32, name: &mut [u16]) -> EnumOutcome;

    /// Counts and size maxima (RegQueryInfoKeyW).
    fn query_info(&self, node: NodeRef) -> (Status, NodeInfo);
}

impl<S: NativeStore + ?Sized> NativeStore for &S {
    fn get_value(
        &self,
        node: NodeRef,
        name: Option<&[u16]>,
        flags: ReadFlags,
        data: Option<&mut [u8]>,
    ) -> GetValueOutcome {
        (**self).get_value(node, name, flags, data)
    }

    fn set_value(&self, node: NodeRef, name: Option<&[u16]>, raw_type: u32, data: &[u8])
        -> Status {
        (**self).set_value(node, name, raw_type, data)
    }

    fn delete_value(&self, node: NodeRef, name: Option<&[u16]>) -> Status {
        (**self).delete_value(node, name)
    }

    fn enum_key(&self, node: NodeRef, index: u32, name: &mut [u16]) -> EnumOutcome {
        (**self).enum_key(node, index, name)
    }

    fn enum_value(&self, node: NodeRef, index: u32, name: &mut [u16]) -> EnumOutcome {
        (**self).enum_value(node, index, name)
    }

    fn query_info(&self, node: NodeRef) -> (Status, NodeInfo) {
        (**self).query_info(node)
    }
}
