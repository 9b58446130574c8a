// ── Destination buffers ───────────────────────────────────────────────────────
//
// A read lands in one of four representations.  Each answers the same
// capability questions so the negotiation engine never needs to know which
// one it is holding:
//   • can it grow, and to what size;
//   • must it be zero-filled before the read;
//   • must it be cut at the first terminator afterwards.
//
// Fixed buffers never grow: running out of room is `BufferTooSmall`, never a
// write past the slice.

use std::{borrow::Cow, sync::Arc};

use crate::error::{RegError, Result};

const WCHAR: usize = std::mem::size_of::<u16>();

// ── Capability traits ─────────────────────────────────────────────────────────

/// Read-side capabilities of a destination.
pub trait ValueBuffer {
    /// Writable view of the whole capacity, or `None` when the capacity is
    /// zero (the store treats a missing destination as a size query).
    fn writable(&mut self) -> Option<&mut [u8]>;

    fn byte_capacity(&self) -> usize;

    fn supports_growth(&self) -> bool {
        false
    }

    /// Resize to exactly `bytes`.  Only meaningful when `supports_growth()`.
    fn grow_to(&mut self, bytes: usize) -> Result<()> {
        Err(RegError::BufferTooSmall {
            required: bytes,
            capacity: self.byte_capacity(),
        })
    }

    fn supports_prepare(&self) -> bool {
        false
    }

    /// Zero-fill before the first read.
    fn prepare(&mut self) {}

    fn supports_trim(&self) -> bool {
        false
    }

    /// Drop everything from the first terminator on.
    fn trim(&mut self) {}
}

/// Write-side view of a source.
pub trait ValuePayload {
    /// The exact bytes handed to the store.
    fn payload(&self) -> Cow<'_, [u8]>;
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Resize `bytes` to exactly `len`, reporting allocation failure instead of
/// aborting.
fn resize_exact(bytes: &mut Vec<u8>, len: usize) -> Result<()> {
    if len > bytes.len() {
        bytes
            .try_reserve_exact(len - bytes.len())
            .map_err(|_| RegError::out_of_memory(len))?;
    }
    bytes.resize(len, 0);
    Ok(())
}

/// Zeroed allocation of exactly `len` bytes.
fn zeroed(len: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    resize_exact(&mut bytes, len)?;
    Ok(bytes)
}

/// Bytes for `chars` UTF-16 units plus one terminator.
fn wide_capacity(chars: usize) -> Result<usize> {
    chars
        .checked_add(1)
        .and_then(|units| units.checked_mul(WCHAR))
        .ok_or(RegError::out_of_memory(usize::MAX))
}

/// Byte offset of the first UTF-16 terminator, or the last whole unit.
fn terminator_offset(bytes: &[u8]) -> usize {
    bytes
        .chunks_exact(WCHAR)
        .position(|c| c[0] == 0 && c[1] == 0)
        .map_or(bytes.len() / WCHAR * WCHAR, |i| i * WCHAR)
}

fn wide_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(WCHAR)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect()
}

/// Encode `s` as UTF-16LE bytes followed by one terminator.
pub(crate) fn wide_bytes_with_terminator(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

// ── FixedBuffer ───────────────────────────────────────────────────────────────

/// Caller-owned storage with a hard capacity.
#[derive(Debug)]
pub struct FixedBuffer<'a> {
    bytes: &'a mut [u8],
}

impl<'a> FixedBuffer<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
    }
}

impl ValueBuffer for FixedBuffer<'_> {
    fn writable(&mut self) -> Option<&mut [u8]> {
        if self.bytes.is_empty() {
            None
        } else {
            Some(&mut *self.bytes)
        }
    }

    fn byte_capacity(&self) -> usize {
        self.bytes.len()
    }
}

impl ValuePayload for FixedBuffer<'_> {
    fn payload(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.bytes)
    }
}

// ── WideString ────────────────────────────────────────────────────────────────

/// Growable UTF-16 string.
///
/// Byte capacity always counts one trailing terminator.  A read may leave the
/// tail untouched, so the buffer is zeroed first and cut at the first
/// terminator afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WideString {
    bytes: Vec<u8>,
}

impl WideString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Room for `chars` UTF-16 units plus the terminator.
    pub fn with_capacity_chars(chars: usize) -> Result<Self> {
        Ok(Self {
            bytes: zeroed(wide_capacity(chars)?)?,
        })
    }

    /// UTF-16 units up to (not including) the first terminator.
    pub fn to_wide(&self) -> Vec<u16> {
        wide_units(&self.bytes)
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.to_wide())
    }
}

impl From<&str> for WideString {
    fn from(s: &str) -> Self {
        Self {
            bytes: wide_bytes_with_terminator(s),
        }
    }
}

impl ValueBuffer for WideString {
    fn writable(&mut self) -> Option<&mut [u8]> {
        if self.bytes.is_empty() {
            None
        } else {
            Some(&mut self.bytes)
        }
    }

    fn byte_capacity(&self) -> usize {
        self.bytes.len()
    }

    fn supports_growth(&self) -> bool {
        true
    }

    fn grow_to(&mut self, bytes: usize) -> Result<()> {
        resize_exact(&mut self.bytes, bytes)
    }

    fn supports_prepare(&self) -> bool {
        true
    }

    fn prepare(&mut self) {
        self.bytes.fill(0);
    }

    fn supports_trim(&self) -> bool {
        true
    }

    fn trim(&mut self) {
        let end = terminator_offset(&self.bytes);
        self.bytes.truncate(end);
    }
}

impl ValuePayload for WideString {
    fn payload(&self) -> Cow<'_, [u8]> {
        if self.bytes.ends_with(&[0, 0]) && self.bytes.len() % WCHAR == 0 {
            Cow::Borrowed(&self.bytes)
        } else {
            let mut owned = self.bytes[..self.bytes.len() / WCHAR * WCHAR].to_vec();
            owned.extend_from_slice(&[0, 0]);
            Cow::Owned(owned)
        }
    }
}

// ── ByteVec ───────────────────────────────────────────────────────────────────

/// Growable opaque bytes.  Payloads are kept verbatim, embedded nulls included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteVec {
    bytes: Vec<u8>,
}

impl ByteVec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Result<Self> {
        Ok(Self {
            bytes: zeroed(bytes)?,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for ByteVec {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl ValueBuffer for ByteVec {
    fn writable(&mut self) -> Option<&mut [u8]> {
        if self.bytes.is_empty() {
            None
        } else {
            Some(&mut self.bytes)
        }
    }

    fn byte_capacity(&self) -> usize {
        self.bytes.len()
    }

    fn supports_growth(&self) -> bool {
        true
    }

    fn grow_to(&mut self, bytes: usize) -> Result<()> {
        resize_exact(&mut self.bytes, bytes)
    }
}

impl ValuePayload for ByteVec {
    fn payload(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.bytes)
    }
}

// ── SharedWideString ──────────────────────────────────────────────────────────

/// String held in an independently allocated block.
///
/// Growing allocates a fresh block and carries over only the bytes both blocks
/// have in common; nothing beyond that survives.  Fresh blocks start zeroed,
/// so no separate prepare step is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedWideString {
    block: Box<[u8]>,
}

impl SharedWideString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_chars(chars: usize) -> Result<Self> {
        Ok(Self {
            block: zeroed(wide_capacity(chars)?)?.into_boxed_slice(),
        })
    }

    /// Hand the decoded string out as a shared, immutable allocation.
    pub fn into_shared(self) -> Arc<str> {
        Arc::from(String::from_utf16_lossy(&wide_units(&self.block)))
    }
}

impl ValueBuffer for SharedWideString {
    fn writable(&mut self) -> Option<&mut [u8]> {
        if self.block.is_empty() {
            None
        } else {
            Some(&mut self.block)
        }
    }

    fn byte_capacity(&self) -> usize {
        self.block.len()
    }

    fn supports_growth(&self) -> bool {
        true
    }

    fn grow_to(&mut self, bytes: usize) -> Result<()> {
        let mut fresh = Vec::new();
        fresh
            .try_reserve_exact(bytes)
            .map_err(|_| RegError::out_of_memory(bytes))?;
        let keep = bytes.min(self.block.len());
        fresh.extend_from_slice(&self.block[..keep]);
        fresh.resize(bytes, 0);
        self.block = fresh.into_boxed_slice();
        Ok(())
    }

    fn supports_trim(&self) -> bool {
        true
    }

    fn trim(&mut self) {
        let end = terminator_offset(&self.block);
        if end != self.block.len() {
            let mut v = std::mem::take(&mut self.block).into_vec();
            v.truncate(end);
            self.block = v.into_boxed_slice();
        }
    }
}

impl ValuePayload for SharedWideString {
    fn payload(&self) -> Cow<'_, [u8]> {
        let end = terminator_offset(&self.block);
        let mut owned = self.block[..end].to_vec();
        owned.extend_from_slice(&[0, 0]);
        Cow::Owned(owned)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_has_no_pointer() {
        assert!(WideString::new().writable().is_none());
        assert!(ByteVec::new().writable().is_none());
        assert!(SharedWideString::new().writable().is_none());
        let mut empty: [u8; 0] = [];
        assert!(FixedBuffer::new(&mut empty).writable().is_none());
    }

    #[test]
    fn string_capacity_counts_the_terminator() {
        assert_eq!(WideString::with_capacity_chars(3).expect("alloc").byte_capacity(), 8);
        assert_eq!(
            SharedWideString::with_capacity_chars(0).expect("alloc").byte_capacity(),
            2
        );
    }

    #[test]
    fn oversized_first_allocation_is_out_of_memory() {
        for err in [
            WideString::with_capacity_chars(usize::MAX).unwrap_err(),
            SharedWideString::with_capacity_chars(usize::MAX / 2).unwrap_err(),
            ByteVec::with_capacity(usize::MAX).map(|_| ()).unwrap_err(),
        ] {
            assert!(matches!(err, RegError::OutOfMemory { .. }), "{err:?}");
        }
    }

    #[test]
    fn fixed_buffer_refuses_to_grow() {
        let mut storage = [0u8; 4];
        let mut buf = FixedBuffer::new(&mut storage);
        assert!(!buf.supports_growth());
        assert_eq!(
            buf.grow_to(8),
            Err(RegError::BufferTooSmall {
                required: 8,
                capacity: 4
            })
        );
    }

    #[test]
    fn wide_string_trims_at_first_terminator() {
        let mut s = WideString::with_capacity_chars(8).expect("alloc");
        s.prepare();
        let bytes = s.writable().expect("capacity");
        bytes[..6].copy_from_slice(&[b'h', 0, b'i', 0, 0, 0]);
        s.trim();
        assert_eq!(s.byte_capacity(), 4);
        assert_eq!(s.to_string_lossy(), "hi");
    }

    #[test]
    fn wide_string_prepare_clears_stale_bytes() {
        let mut s = WideString::from("stale");
        s.prepare();
        assert!(s.writable().expect("capacity").iter().all(|&b| b == 0));
    }

    #[test]
    fn wide_string_payload_is_terminated() {
        let s = WideString::from("ab");
        assert_eq!(&*s.payload(), &[b'a', 0, b'b', 0, 0, 0]);

        let mut trimmed = WideString::from("ab");
        trimmed.trim();
        assert_eq!(&*trimmed.payload(), &[b'a', 0, b'b', 0, 0, 0]);
    }

    #[test]
    fn growth_is_exact_and_preserves_prefix() {
        let mut b = ByteVec::from(vec![1, 2, 3]);
        b.grow_to(5).expect("grow");
        assert_eq!(b.as_bytes(), &[1, 2, 3, 0, 0]);
        b.grow_to(2).expect("shrink");
        assert_eq!(b.as_bytes(), &[1, 2]);
    }

    #[test]
    fn shared_string_reallocation_copies_only_overlap() {
        let mut s = SharedWideString::with_capacity_chars(1).expect("alloc");
        s.writable().expect("capacity").copy_from_slice(&[b'x', 0, 0, 0]);
        s.grow_to(2).expect("shrink");
        assert_eq!(s.byte_capacity(), 2);
        s.grow_to(10).expect("grow");
        assert_eq!(s.byte_capacity(), 10);
        assert_eq!(&*s.into_shared(), "x");
    }

    #[test]
    fn absurd_growth_reports_out_of_memory() {
        let mut b = ByteVec::new();
        let err = b.grow_to(usize::MAX).unwrap_err();
        assert_eq!(err, RegError::out_of_memory(usize::MAX));
    }
}
