// ── In-memory registry ────────────────────────────────────────────────────────
//
// Emulates the registry's call contract closely enough that the negotiation
// engine cannot tell it from the real thing: size queries with a missing
// destination, partial copies plus MORE_DATA, UNSUPPORTED_TYPE on a flag
// mismatch, terminator fix-ups on string payloads, `%VAR%` expansion, and
// NO_MORE_ITEMS at the end of an enumeration.
//
// Nodes live in an arena indexed by `NodeRef`.  Deleted nodes leave a hole so
// stale handles answer KEY_DELETED rather than aliasing a newer node.

use std::{
    borrow::Cow,
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        PoisonError, RwLock,
    },
};

use crate::{
    error::{RegError, Result},
    status::Status,
    store::{EnumOutcome, GetValueOutcome, NativeStore, NodeInfo, NodeRef},
    wire::{ReadFlags, WireType},
};

// ── Arena ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct StoredValue {
    /// Empty for the default value.
    name: Vec<u16>,
    raw_type: u32,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct Node {
    name: Vec<u16>,
    parent: Option<usize>,
    /// Insertion order is enumeration order.
    children: Vec<usize>,
    values: Vec<StoredValue>,
}

#[derive(Debug)]
struct Arena {
    nodes: Vec<Option<Node>>,
    /// Keys are lower-cased.
    environment: HashMap<String, String>,
}

impl Arena {
    fn index(&self, node: NodeRef) -> std::result::Result<usize, Status> {
        let index = usize::try_from(node.0).map_err(|_| Status::INVALID_HANDLE)?;
        match self.nodes.get(index) {
            Some(Some(_)) => Ok(index),
            Some(None) => Err(Status::KEY_DELETED),
            None => Err(Status::INVALID_HANDLE),
        }
    }

    fn node(&self, node: NodeRef) -> std::result::Result<&Node, Status> {
        let index = self.index(node)?;
        self.nodes[index].as_ref().ok_or(Status::KEY_DELETED)
    }

    fn node_mut(&mut self, node: NodeRef) -> std::result::Result<&mut Node, Status> {
        let index = self.index(node)?;
        self.nodes[index].as_mut().ok_or(Status::KEY_DELETED)
    }

    fn child(&self, parent: usize, name: &[u16]) -> Option<usize> {
        let node = self.nodes[parent].as_ref()?;
        node.children.iter().copied().find(|&c| {
            self.nodes[c]
                .as_ref()
                .is_some_and(|child| names_match(&child.name, name))
        })
    }

    fn remove_subtree(&mut self, index: usize) {
        if let Some(node) = self.nodes[index].take() {
            for child in node.children {
                self.remove_subtree(child);
            }
        }
    }

    fn lookup_env(&self, name: &str) -> Option<String> {
        self.environment
            .get(&name.to_lowercase())
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    /// Replace `%NAME%` with its value; unknown names stay verbatim.
    fn expand(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('%') else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let name = &after[..end];
            match self.lookup_env(name) {
                Some(value) if !name.is_empty() => {
                    out.push_str(&value);
                    rest = &after[end + 1..];
                }
                _ => {
                    // The closing '%' may open the next placeholder.
                    out.push('%');
                    out.push_str(name);
                    rest = &after[end..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

/// Registry names compare case-insensitively.
fn names_match(a: &[u16], b: &[u16]) -> bool {
    a == b || String::from_utf16_lossy(a).to_lowercase() == String::from_utf16_lossy(b).to_lowercase()
}

fn value_name(name: Option<&[u16]>) -> &[u16] {
    name.unwrap_or(&[])
}

/// String payloads always come back terminated; multi-strings doubly so.
fn terminated(raw_type: u32, data: &[u8]) -> Cow<'_, [u8]> {
    let wanted: &[u8] = match WireType::from_raw(raw_type) {
        WireType::String | WireType::ExpandString => &[0, 0],
        WireType::MultiString => &[0, 0, 0, 0],
        _ => return Cow::Borrowed(data),
    };
    if data.len() % 2 == 0 && data.ends_with(wanted) {
        return Cow::Borrowed(data);
    }
    let mut owned = data.to_vec();
    if owned.len() % 2 != 0 {
        owned.push(0);
    }
    while !owned.ends_with(wanted) {
        owned.extend_from_slice(&[0, 0]);
    }
    Cow::Owned(owned)
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Copy `name` plus a terminator into `buf`, or report the length needed.
fn copy_name(name: &[u16], buf: &mut [u16], raw_type: u32) -> EnumOutcome {
    if buf.len() <= name.len() {
        return EnumOutcome {
            status: Status::MORE_DATA,
            name_len: len_u32(name.len() + 1),
            raw_type,
        };
    }
    buf[..name.len()].copy_from_slice(name);
    buf[name.len()] = 0;
    EnumOutcome {
        status: Status::SUCCESS,
        name_len: len_u32(name.len()),
        raw_type,
    }
}

fn failed_enum(status: Status) -> EnumOutcome {
    EnumOutcome {
        status,
        name_len: 0,
        raw_type: 0,
    }
}

fn failed_get(status: Status) -> GetValueOutcome {
    GetValueOutcome {
        status,
        raw_type: 0,
        data_len: 0,
    }
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// A registry kept in process memory.
///
/// `root()` is created up front; everything else hangs off it via
/// `create_key`.  Counters record how many value reads and enumeration calls
/// were issued so callers can observe the negotiation's call budget.
#[derive(Debug)]
pub struct MemoryStore {
    arena: RwLock<Arena>,
    get_value_calls: AtomicUsize,
    enum_calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            arena: RwLock::new(Arena {
                nodes: vec![Some(Node::default())],
                environment: HashMap::new(),
            }),
            get_value_calls: AtomicUsize::new(0),
            enum_calls: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> NodeRef {
        NodeRef(0)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Arena> {
        self.arena.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Arena> {
        self.arena.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open or create every component of the `\`-separated `path` below
    /// `parent`.  An empty path returns `parent` itself.
    pub fn create_key(&self, parent: NodeRef, path: &str) -> Result<NodeRef> {
        let mut arena = self.write();
        let mut current = arena
            .index(parent)
            .map_err(|s| RegError::from_status(s, "RegCreateKeyExW"))?;
        for component in path.split('\\').filter(|c| !c.is_empty()) {
            let name = wide(component);
            current = match arena.child(current, &name) {
                Some(existing) => existing,
                None => {
                    let index = arena.nodes.len();
                    arena.nodes.push(Some(Node {
                        name,
                        parent: Some(current),
                        ..Node::default()
                    }));
                    if let Some(p) = arena.nodes[current].as_mut() {
                        p.children.push(index);
                    }
                    tracing::trace!(key = component, index, "created key");
                    index
                }
            };
        }
        Ok(NodeRef(current as isize))
    }

    /// Resolve an existing `path` below `parent`.
    pub fn open_key(&self, parent: NodeRef, path: &str) -> Result<NodeRef> {
        let arena = self.read();
        let mut current = arena
            .index(parent)
            .map_err(|s| RegError::from_status(s, "RegOpenKeyExW"))?;
        for component in path.split('\\').filter(|c| !c.is_empty()) {
            current = arena
                .child(current, &wide(component))
                .ok_or_else(|| RegError::from_status(Status::FILE_NOT_FOUND, "RegOpenKeyExW"))?;
        }
        Ok(NodeRef(current as isize))
    }

    /// Remove the key at `path` below `parent` together with everything
    /// beneath it.  Handles to removed keys answer KEY_DELETED afterwards.
    pub fn delete_key(&self, parent: NodeRef, path: &str) -> Result<()> {
        if path.split('\\').all(str::is_empty) {
            return Err(RegError::InvalidArgument("cannot delete a key through an empty path"));
        }
        let target = self.open_key(parent, path)?;
        let mut arena = self.write();
        let index = arena
            .index(target)
            .map_err(|s| RegError::from_status(s, "RegDeleteTreeW"))?;
        let owner = arena.nodes[index].as_ref().and_then(|n| n.parent);
        if let Some(p) = owner.and_then(|p| arena.nodes[p].as_mut()) {
            p.children.retain(|&c| c != index);
        }
        arena.remove_subtree(index);
        Ok(())
    }

    /// Define `%name%` for expandable-string reads.  Names not defined here
    /// fall back to the process environment.
    pub fn set_env(&self, name: &str, value: &str) {
        self.write()
            .environment
            .insert(name.to_lowercase(), value.to_owned());
    }

    /// Value reads issued so far.
    pub fn get_value_calls(&self) -> usize {
        self.get_value_calls.load(Ordering::Relaxed)
    }

    /// Enumerate-at-index calls issued so far.
    pub fn enum_calls(&self) -> usize {
        self.enum_calls.load(Ordering::Relaxed)
    }

    pub fn reset_counters(&self) {
        self.get_value_calls.store(0, Ordering::Relaxed);
        self.enum_calls.store(0, Ordering::Relaxed);
    }
}

impl NativeStore for MemoryStore {
    fn get_value(
        &self,
        node: NodeRef,
        name: Option<&[u16]>,
        flags: ReadFlags,
        data: Option<&mut [u8]>,
    ) -> GetValueOutcome {
        self.get_value_calls.fetch_add(1, Ordering::Relaxed);
        let arena = self.read();
        let node = match arena.node(node) {
            Ok(n) => n,
            Err(status) => return failed_get(status),
        };
        let wanted = value_name(name);
        let Some(value) = node.values.iter().find(|v| names_match(&v.name, wanted)) else {
            return failed_get(Status::FILE_NOT_FOUND);
        };

        let stored = WireType::from_raw(value.raw_type);
        if !flags.accepts(stored) {
            return GetValueOutcome {
                status: Status::UNSUPPORTED_TYPE,
                raw_type: value.raw_type,
                data_len: 0,
            };
        }

        let (raw_type, payload) =
            if stored == WireType::ExpandString && !flags.contains(ReadFlags::NOEXPAND) {
                let units: Vec<u16> = value
                    .data
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .take_while(|&u| u != 0)
                    .collect();
                let expanded = arena.expand(&String::from_utf16_lossy(&units));
                (
                    WireType::String.as_raw(),
                    Cow::Owned(crate::buffer::wide_bytes_with_terminator(&expanded)),
                )
            } else {
                (value.raw_type, terminated(value.raw_type, &value.data))
            };

        let required = payload.len();
        let status = match data {
            None => Status::SUCCESS,
            Some(buf) if buf.len() < required => {
                let n = buf.len();
                buf.copy_from_slice(&payload[..n]);
                Status::MORE_DATA
            }
            Some(buf) => {
                buf[..required].copy_from_slice(&payload);
                Status::SUCCESS
            }
        };
        GetValueOutcome {
            status,
            raw_type,
            data_len: len_u32(required),
        }
    }

    fn set_value(&self, node: NodeRef, name: Option<&[u16]>, raw_type: u32, data: &[u8])
        -> Status {
        if u32::try_from(data.len()).is_err() {
            return Status::INVALID_PARAMETER;
        }
        let mut arena = self.write();
        let node = match arena.node_mut(node) {
            Ok(n) => n,
            Err(status) => return status,
        };
        let wanted = value_name(name);
        match node.values.iter_mut().find(|v| names_match(&v.name, wanted)) {
            Some(existing) => {
                existing.raw_type = raw_type;
                existing.data = data.to_vec();
            }
            None => node.values.push(StoredValue {
                name: wanted.to_vec(),
                raw_type,
                data: data.to_vec(),
            }),
        }
        Status::SUCCESS
    }

    fn delete_value(&self, node: NodeRef, name: Option<&[u16]>) -> Status {
        let mut arena = self.write();
        let node = match arena.node_mut(node) {
            Ok(n) => n,
            Err(status) => return status,
        };
        let wanted = value_name(name);
        match node.values.iter().position(|v| names_match(&v.name, wanted)) {
            Some(i) => {
                node.values.remove(i);
                Status::SUCCESS
            }
            None => Status::FILE_NOT_FOUND,
        }
    }

    fn enum_key(&self, node: NodeRef, index: u32, name: &mut [u16]) -> EnumOutcome {
        self.enum_calls.fetch_add(1, Ordering::Relaxed);
        let arena = self.read();
        let node = match arena.node(node) {
            Ok(n) => n,
            Err(status) => return failed_enum(status),
        };
        let child = node
            .children
            .get(index as usize)
            .and_then(|&c| arena.nodes[c].as_ref());
        match child {
            Some(child) => copy_name(&child.name, name, 0),
            None => failed_enum(Status::NO_MORE_ITEMS),
        }
    }

    fn enum_value(&self, node: NodeRef, index: u32, name: &mut [u16]) -> EnumOutcome {
        self.enum_calls.fetch_add(1, Ordering::Relaxed);
        let arena = self.read();
        let node = match arena.node(node) {
            Ok(n) => n,
            Err(status) => return failed_enum(status),
        };
        match node.values.get(index as usize) {
            Some(value) => copy_name(&value.name, name, value.raw_type),
            None => failed_enum(Status::NO_MORE_ITEMS),
        }
    }

    fn query_info(&self, node: NodeRef) -> (Status, NodeInfo) {
        let arena = self.read();
        let node = match arena.node(node) {
            Ok(n) => n,
            Err(status) => return (status, NodeInfo::default()),
        };
        let children = node.children.iter().filter_map(|&c| arena.nodes[c].as_ref());
        let info = NodeInfo {
            child_keys: len_u32(node.children.len()),
            values: len_u32(node.values.len()),
            max_key_name_len: children.map(|c| len_u32(c.name.len())).max().unwrap_or(0),
            max_value_name_len: node
                .values
                .iter()
                .map(|v| len_u32(v.name.len()))
                .max()
                .unwrap_or(0),
            max_data_len: node
                .values
                .iter()
                .map(|v| len_u32(v.data.len()))
                .max()
                .unwrap_or(0),
        };
        (Status::SUCCESS, info)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
