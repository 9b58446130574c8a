// ── Win32 registry backend ────────────────────────────────────────────────────
//
// `Win32Store` forwards each `NativeStore` call to the matching Reg*W function
// and hands back the raw WIN32_ERROR.  `OwnedKey` is the RAII owner of an
// opened HKEY; the rest of the crate only ever sees borrowed `NodeRef`s.
//
// RegEnumKeyExW and RegEnumValueW do not say how long a name is when they
// answer ERROR_MORE_DATA.  The backend asks RegQueryInfoKeyW for the longest
// name instead, so the cursor still grows to an exact, store-reported size.

#![allow(unsafe_code)]

use std::ffi::c_void;

use windows::{
    core::{PCWSTR, PWSTR},
    Win32::System::Registry::{
        RegCloseKey, RegCreateKeyExW, RegDeleteTreeW, RegDeleteValueW, RegEnumKeyExW,
        RegEnumValueW, RegGetValueW, RegOpenKeyExW, RegQueryInfoKeyW, RegSetValueExW, HKEY,
        HKEY_CLASSES_ROOT, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS, KEY_ALL_ACCESS,
        KEY_READ, KEY_WRITE, REG_OPTION_NON_VOLATILE, REG_ROUTINE_FLAGS, REG_SAM_FLAGS,
        REG_VALUE_TYPE,
    },
};

use crate::{
    error::{RegError, Result},
    status::Status,
    store::{EnumOutcome, GetValueOutcome, NativeStore, NodeInfo, NodeRef},
    wire::ReadFlags,
};

// ── Handles ───────────────────────────────────────────────────────────────────

fn hkey(node: NodeRef) -> HKEY {
    HKEY(node.0 as *mut c_void)
}

fn node_ref(key: HKEY) -> NodeRef {
    NodeRef(key.0 as isize)
}

/// The predefined top-level keys.  They are never closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKey {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
}

impl RootKey {
    pub fn node(self) -> NodeRef {
        node_ref(match self {
            Self::ClassesRoot => HKEY_CLASSES_ROOT,
            Self::CurrentUser => HKEY_CURRENT_USER,
            Self::LocalMachine => HKEY_LOCAL_MACHINE,
            Self::Users => HKEY_USERS,
        })
    }
}

/// Rights requested when opening or creating a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    All,
}

impl Access {
    fn sam(self) -> REG_SAM_FLAGS {
        match self {
            Self::Read => KEY_READ,
            Self::Write => KEY_WRITE,
            Self::All => KEY_ALL_ACCESS,
        }
    }
}

/// RAII owner of an opened registry key.
///
/// `RegCloseKey` is called on `Drop`.  Borrow the key with `node()` for the
/// duration of a `Registry` call.
#[derive(Debug)]
pub struct OwnedKey(HKEY);

impl OwnedKey {
    pub fn node(&self) -> NodeRef {
        node_ref(self.0)
    }
}

impl Drop for OwnedKey {
    fn drop(&mut self) {
        // SAFETY: self.0 was returned by RegOpenKeyExW / RegCreateKeyExW and
        // is closed exactly once, here.  The return value is ignored; there is
        // no recovery from a failed close during drop.
        unsafe {
            let _ = RegCloseKey(self.0);
        }
    }
}

// ── Strings ───────────────────────────────────────────────────────────────────

/// Null-terminated copy of an optional name.
fn terminated(name: Option<&[u16]>) -> Option<Vec<u16>> {
    name.map(|n| n.iter().copied().chain(std::iter::once(0)).collect())
}

fn pcwstr(name: &Option<Vec<u16>>) -> PCWSTR {
    name.as_ref()
        .map_or(PCWSTR::null(), |n| PCWSTR(n.as_ptr()))
}

fn wide_path(path: &str) -> Vec<u16> {
    path.encode_utf16().chain(std::iter::once(0)).collect()
}

// ── Win32Store ────────────────────────────────────────────────────────────────

/// The live Windows registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Store;

impl Win32Store {
    /// Open an existing key below `parent`.
    pub fn open(&self, parent: NodeRef, path: &str, access: Access) -> Result<OwnedKey> {
        let path = wide_path(path);
        let mut key = HKEY::default();
        // SAFETY: `path` is a valid null-terminated UTF-16 string that outlives
        // the call; `key` is a valid out-pointer.
        let status = unsafe { RegOpenKeyExW(hkey(parent), PCWSTR(path.as_ptr()), 0, access.sam(), &mut key) };
        if status.0 != 0 {
            return Err(RegError::from_status(Status(status.0), "RegOpenKeyExW"));
        }
        Ok(OwnedKey(key))
    }

    /// Open `path` below `parent`, creating any missing components.
    pub fn create(&self, parent: NodeRef, path: &str, access: Access) -> Result<OwnedKey> {
        let path = wide_path(path);
        let mut key = HKEY::default();
        // SAFETY: `path` is null-terminated and outlives the call; the class,
        // security attributes, and disposition are all optional and omitted.
        let status = unsafe {
            RegCreateKeyExW(
                hkey(parent),
                PCWSTR(path.as_ptr()),
                0,
                PCWSTR::null(),
                REG_OPTION_NON_VOLATILE,
                access.sam(),
                None,
                &mut key,
                None,
            )
        };
        if status.0 != 0 {
            return Err(RegError::from_status(Status(status.0), "RegCreateKeyExW"));
        }
        Ok(OwnedKey(key))
    }

    /// Delete `path` below `parent` and everything under it.
    pub fn delete_tree(&self, parent: NodeRef, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(RegError::InvalidArgument("cannot delete a key through an empty path"));
        }
        let path = wide_path(path);
        // SAFETY: `path` is a valid null-terminated UTF-16 string.
        let status = unsafe { RegDeleteTreeW(hkey(parent), PCWSTR(path.as_ptr())) };
        if status.0 != 0 {
            return Err(RegError::from_status(Status(status.0), "RegDeleteTreeW"));
        }
        Ok(())
    }

    /// Longest child-key or value name, plus the terminator.
    fn required_name_len(&self, node: NodeRef, keys: bool) -> EnumOutcome {
        let (status, info) = self.query_info(node);
        let longest = if keys {
            info.max_key_name_len
        } else {
            info.max_value_name_len
        };
        EnumOutcome {
            status: if status.is_success() {
                Status::MORE_DATA
            } else {
                status
            },
            name_len: longest.saturating_add(1),
            raw_type: 0,
        }
    }
}

impl NativeStore for Win32Store {
    fn get_value(
        &self,
        node: NodeRef,
        name: Option<&[u16]>,
        flags: ReadFlags,
        data: Option<&mut [u8]>,
    ) -> GetValueOutcome {
        let name = terminated(name);
        let mut raw_type = REG_VALUE_TYPE::default();
        let (ptr, mut len) = match data {
            Some(buf) => (
                Some(buf.as_mut_ptr().cast::<c_void>()),
                u32::try_from(buf.len()).unwrap_or(u32::MAX),
            ),
            None => (None, 0),
        };
        // SAFETY: `name` is null-terminated (or null for the default value);
        // `ptr` addresses `len` writable bytes borrowed for this call only.
        let status = unsafe {
            RegGetValueW(
                hkey(node),
                PCWSTR::null(),
                pcwstr(&name),
                REG_ROUTINE_FLAGS(flags.0),
                Some(&mut raw_type),
                ptr,
                Some(&mut len),
            )
        };
        GetValueOutcome {
            status: Status(status.0),
            raw_type: raw_type.0,
            data_len: len,
        }
    }

    fn set_value(&self, node: NodeRef, name: Option<&[u16]>, raw_type: u32, data: &[u8])
        -> Status {
        let name = terminated(name);
        // SAFETY: `name` is null-terminated or null; `data` is a valid slice
        // the call only reads.
        let status = unsafe {
            RegSetValueExW(hkey(node), pcwstr(&name), 0, REG_VALUE_TYPE(raw_type), Some(data))
        };
        Status(status.0)
    }

    fn delete_value(&self, node: NodeRef, name: Option<&[u16]>) -> Status {
        let name = terminated(name);
        // SAFETY: `name` is null-terminated or null.
        let status = unsafe { RegDeleteValueW(hkey(node), pcwstr(&name)) };
        Status(status.0)
    }

    fn enum_key(&self, node: NodeRef, index: u32, name: &mut [u16]) -> EnumOutcome {
        let mut len = u32::try_from(name.len()).unwrap_or(u32::MAX);
        // SAFETY: `name` provides `len` writable UTF-16 units for this call.
        // Class and last-write time are not requested.
        let status = unsafe {
            RegEnumKeyExW(
                hkey(node),
                index,
                PWSTR(name.as_mut_ptr()),
                &mut len,
                None,
                PWSTR::null(),
                None,
                None,
            )
        };
        let status = Status(status.0);
        if status == Status::MORE_DATA {
            return self.required_name_len(node, true);
        }
        EnumOutcome {
            status,
            name_len: len,
            raw_type: 0,
        }
    }

    fn enum_value(&self, node: NodeRef, index: u32, name: &mut [u16]) -> EnumOutcome {
        let mut len = u32::try_from(name.len()).unwrap_or(u32::MAX);
        let mut raw_type = 0u32;
        // SAFETY: `name` provides `len` writable UTF-16 units for this call.
        // The payload is not requested.
        let status = unsafe {
            RegEnumValueW(
                hkey(node),
                index,
                PWSTR(name.as_mut_ptr()),
                &mut len,
                None,
                Some(&mut raw_type),
                None,
                None,
            )
        };
        let status = Status(status.0);
        if status == Status::MORE_DATA {
            return self.required_name_len(node, false);
        }
        EnumOutcome {
            status,
            name_len: len,
            raw_type,
        }
    }

    fn query_info(&self, node: NodeRef) -> (Status, NodeInfo) {
        let mut info = NodeInfo::default();
        // SAFETY: every out-pointer addresses a live u32 field of `info`;
        // class, security descriptor, and timestamps are not requested.
        let status = unsafe {
            RegQueryInfoKeyW(
                hkey(node),
                PWSTR::null(),
                None,
                None,
                Some(&mut info.child_keys),
                Some(&mut info.max_key_name_len),
                None,
                Some(&mut info.values),
                Some(&mut info.max_value_name_len),
                Some(&mut info.max_data_len),
                None,
                None,
            )
        };
        (Status(status.0), info)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
