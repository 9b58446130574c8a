// ── Facade configuration ──────────────────────────────────────────────────────
//
// Passed explicitly to `Registry::with_config`; there is no process-wide
// setting.  Can be read from a JSON file so a host application can pick the
// error policy and first-allocation sizes without recompiling.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::signal::ErrorPolicy;

/// First allocation for enumeration name buffers, in UTF-16 units.
pub const DEFAULT_NAME_BUFFER_CHARS: usize = 16;

/// First allocation for growable string reads, in UTF-16 units (plus one
/// terminator).
pub const DEFAULT_STRING_BUFFER_CHARS: usize = 64;

/// Settings for a `Registry` facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)] // partial files fill the gaps with defaults
pub struct RegistryConfig {
    /// How failures reach the caller.
    pub error_policy: ErrorPolicy,
    pub name_buffer_chars: usize,
    pub string_buffer_chars: usize,
    /// First allocation for growable byte reads.  Zero makes the first call a
    /// pure size query.
    pub binary_buffer_bytes: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::ReturnCode,
            name_buffer_chars: DEFAULT_NAME_BUFFER_CHARS,
            string_buffer_chars: DEFAULT_STRING_BUFFER_CHARS,
            binary_buffer_bytes: 0,
        }
    }
}

impl RegistryConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> io::Result<Self> {
        serde_json::from_str(text).map_err(io::Error::other)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let data = fs::read(path.as_ref())?;
        serde_json::from_slice(&data).map_err(io::Error::other)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = fs::File::create(path.as_ref())?;
        serde_json::to_writer_pretty(file, self).map_err(io::Error::other)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
