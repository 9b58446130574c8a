// ── Enumeration cursor ────────────────────────────────────────────────────────
//
// Forward-only walk over a node's child keys or values by ordinal index.
//
// A cursor is either positioned (index, cached name, cached type) or at the
// end (index == END_INDEX, empty name buffer).  Each advance re-asks the
// store for the entry at the new index.  The name buffer grows to exactly the
// length the store reports, the same idiom the value reads use.
//
// The node is borrowed: the cursor never opens or closes it.

use std::fmt;

use crate::{
    error::{RegError, Result},
    signal::ErrorSignal,
    status::Status,
    store::{EnumOutcome, NativeStore, NodeRef},
    wire::WireType,
};

/// Reserved index of the end state.
pub const END_INDEX: u32 = u32::MAX;

/// What a cursor walks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumTarget {
    Keys,
    Values,
}

impl EnumTarget {
    fn function(self) -> &'static str {
        match self {
            Self::Keys => "RegEnumKeyExW",
            Self::Values => "RegEnumValueW",
        }
    }
}

/// One enumerated child key or value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    /// `None` for keys.
    pub wire_type: Option<WireType>,
}

// ── Cursor ────────────────────────────────────────────────────────────────────

pub struct Cursor<'s, S: NativeStore + ?Sized> {
    store: &'s S,
    signal: &'s dyn ErrorSignal,
    node: NodeRef,
    target: EnumTarget,
    index: u32,
    name: Vec<u16>,
    name_len: usize,
    wire_type: Option<WireType>,
}

impl<'s, S: NativeStore + ?Sized> Cursor<'s, S> {
    /// Position a cursor on the first entry of `node`, or at the end when
    /// there is none.  `name_chars` is the first name-buffer allocation in
    /// UTF-16 units, terminator included.
    pub fn begin(
        store: &'s S,
        node: NodeRef,
        target: EnumTarget,
        name_chars: usize,
        signal: &'s dyn ErrorSignal,
    ) -> Result<Self> {
        let mut cursor = Self {
            store,
            signal,
            node,
            target,
            index: 0,
            name: Vec::new(),
            name_len: 0,
            wire_type: None,
        };
        cursor.resize_name(name_chars.max(1))?;
        cursor.fetch()?;
        Ok(cursor)
    }

    /// A cursor already in the end state.
    pub fn end(store: &'s S, node: NodeRef, target: EnumTarget, signal: &'s dyn ErrorSignal) -> Self {
        Self {
            store,
            signal,
            node,
            target,
            index: END_INDEX,
            name: Vec::new(),
            name_len: 0,
            wire_type: None,
        }
    }

    pub fn is_end(&self) -> bool {
        self.index == END_INDEX
    }

    /// Current ordinal, `None` at the end.
    pub fn index(&self) -> Option<u32> {
        (!self.is_end()).then_some(self.index)
    }

    pub fn node(&self) -> NodeRef {
        self.node
    }

    pub fn target(&self) -> EnumTarget {
        self.target
    }

    /// Name of the current entry as UTF-16, without terminator.
    pub fn name(&self) -> Result<&[u16]> {
        self.check_positioned()?;
        Ok(&self.name[..self.name_len])
    }

    pub fn name_string(&self) -> Result<String> {
        self.name().map(String::from_utf16_lossy)
    }

    /// Stored type of the current value; `None` when walking keys.
    pub fn wire_type(&self) -> Result<Option<WireType>> {
        self.check_positioned()?;
        Ok(self.wire_type)
    }

    pub fn entry(&self) -> Result<Entry> {
        Ok(Entry {
            name: self.name_string()?,
            wire_type: self.wire_type()?,
        })
    }

    /// Move forward by `n` entries.  Zero is a no-op.
    ///
    /// Fails on an end cursor and when the new ordinal would overflow or land
    /// on `END_INDEX`.
    pub fn advance(&mut self, n: u32) -> Result<()> {
        if self.is_end() {
            return Err(self
                .signal
                .signal(RegError::InvalidArgument("cannot advance an end cursor")));
        }
        if n == 0 {
            return Ok(());
        }
        let next = match self.index.checked_add(n) {
            Some(next) if next != END_INDEX => next,
            _ => {
                return Err(self
                    .signal
                    .signal(RegError::InvalidArgument("cursor index overflow")));
            }
        };
        self.index = next;
        self.fetch()
    }

    fn check_positioned(&self) -> Result<()> {
        if self.is_end() {
            Err(self
                .signal
                .signal(RegError::InvalidArgument("end cursor has no entry")))
        } else {
            Ok(())
        }
    }

    fn resize_name(&mut self, chars: usize) -> Result<()> {
        if chars > self.name.len() {
            self.name
                .try_reserve_exact(chars - self.name.len())
                .map_err(|_| {
                    self.signal.signal(RegError::out_of_memory(
                        chars.saturating_mul(std::mem::size_of::<u16>()),
                    ))
                })?;
        }
        self.name.resize(chars, 0);
        Ok(())
    }

    fn set_end(&mut self) {
        self.index = END_INDEX;
        self.name = Vec::new();
        self.name_len = 0;
        self.wire_type = None;
    }

    fn call(&mut self) -> EnumOutcome {
        match self.target {
            EnumTarget::Keys => self.store.enum_key(self.node, self.index, &mut self.name),
            EnumTarget::Values => self.store.enum_value(self.node, self.index, &mut self.name),
        }
    }

    /// Load the entry at `self.index`, growing the name buffer as needed.
    fn fetch(&mut self) -> Result<()> {
        let function = self.target.function();
        loop {
            let outcome = self.call();
            tracing::trace!(
                node = ?self.node,
                index = self.index,
                capacity = self.name.len(),
                status = %outcome.status,
                "{function}"
            );
            match outcome.status {
                Status::SUCCESS => {
                    let reported = (outcome.name_len as usize).min(self.name.len());
                    self.name_len = self.name[..reported]
                        .iter()
                        .position(|&u| u == 0)
                        .unwrap_or(reported);
                    self.wire_type = match self.target {
                        EnumTarget::Keys => None,
                        EnumTarget::Values => Some(WireType::from_raw(outcome.raw_type)),
                    };
                    return self.signal.success();
                }
                Status::NO_MORE_ITEMS => {
                    tracing::debug!(node = ?self.node, index = self.index, "enumeration finished");
                    self.set_end();
                    return Ok(());
                }
                Status::MORE_DATA => {
                    let required = outcome.name_len as usize;
                    if required <= self.name.len() {
                        // No progress possible at the reported size.
                        let capacity = self.name.len() * 2;
                        self.set_end();
                        return Err(self.signal.signal(RegError::BufferTooSmall {
                            required: required * 2,
                            capacity,
                        }));
                    }
                    tracing::debug!(from = self.name.len(), to = required, "growing name buffer");
                    if let Err(e) = self.resize_name(required) {
                        self.set_end();
                        return Err(e);
                    }
                }
                status => {
                    self.set_end();
                    self.signal.from_status(status, function)?;
                    return Err(RegError::from_status(status, function));
                }
            }
        }
    }
}

impl<S: NativeStore + ?Sized> PartialEq for Cursor<'_, S> {
    /// End cursors are all equal.  Positioned cursors are equal when they
    /// walk the same kind of entry of the same node in the same store and sit
    /// on the same index.
    fn eq(&self, other: &Self) -> bool {
        match (self.is_end(), other.is_end()) {
            (true, true) => true,
            (false, false) => {
                std::ptr::eq(self.store, other.store)
                    && self.node == other.node
                    && self.target == other.target
                    && self.index == other.index
            }
            _ => false,
        }
    }
}

impl<S: NativeStore + ?Sized> fmt::Debug for Cursor<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("node", &self.node)
            .field("target", &self.target)
            .field("index", &self.index())
            .field("name", &String::from_utf16_lossy(&self.name[..self.name_len]))
            .field("wire_type", &self.wire_type)
            .finish()
    }
}

// ── Iterator adapter ──────────────────────────────────────────────────────────

/// Yields every entry a cursor visits, stopping after the first error.
#[derive(Debug)]
pub struct Entries<'s, S: NativeStore + ?Sized> {
    cursor: Cursor<'s, S>,
    started: bool,
    done: bool,
}

impl<'s, S: NativeStore + ?Sized> Entries<'s, S> {
    pub fn new(cursor: Cursor<'s, S>) -> Self {
        Self {
            cursor,
            started: false,
            done: false,
        }
    }
}

impl<S: NativeStore + ?Sized> Iterator for Entries<'_, S> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.started {
            if let Err(e) = self.cursor.advance(1) {
                self.done = true;
                return Some(Err(e));
            }
        }
        self.started = true;
        if self.cursor.is_end() {
            self.done = true;
            return None;
        }
        Some(self.cursor.entry())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
