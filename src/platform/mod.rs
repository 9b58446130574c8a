// ── Platform abstraction layer ────────────────────────────────────────────────
//
// Native `NativeStore` implementations.  No `unsafe` lives here; all Win32 FFI
// is confined to the `win32` sub-module and never leaks outward.

#[cfg(windows)]
pub mod win32;
