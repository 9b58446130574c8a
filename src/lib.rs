// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except `platform::win32`, which holds
// the registry FFI.  Each unsafe block there MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

//! Typed access to variable-length registry values.
//!
//! Reads negotiate the payload size with the store, growing the destination
//! to the exact size it reports.  Failures go through a pluggable
//! [`ErrorSignal`]; the default returns them as [`RegError`].
//!
//! ```
//! use regkit::{MemoryStore, Registry};
//!
//! let store = MemoryStore::new();
//! let root = store.root();
//! let reg = Registry::new(store);
//! reg.set_multi_string(root, Some("paths"), &["C:\\bin", "D:\\tools"])?;
//! assert_eq!(reg.get_multi_string(root, Some("paths"))?, ["C:\\bin", "D:\\tools"]);
//! # Ok::<(), regkit::RegError>(())
//! ```

pub mod buffer;
pub mod config;
pub mod cursor;
pub mod error;
pub mod multi_sz;
pub mod negotiate;
pub mod platform;
pub mod registry;
pub mod signal;
pub mod status;
pub mod store;
pub mod wire;

pub use buffer::{ByteVec, FixedBuffer, SharedWideString, ValueBuffer, ValuePayload, WideString};
pub use config::RegistryConfig;
pub use cursor::{Cursor, EnumTarget, Entries, Entry, END_INDEX};
pub use error::{ErrorKind, RegError, Result};
pub use negotiate::ValueInfo;
pub use registry::Registry;
pub use signal::{ErrorPolicy, ErrorSignal};
pub use status::Status;
pub use store::{MemoryStore, NativeStore, NodeInfo, NodeRef};
pub use wire::{ReadFlags, WireType};

#[cfg(windows)]
pub use platform::win32::{Access, OwnedKey, RootKey, Win32Store};
