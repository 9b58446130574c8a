// ── Registry facade ───────────────────────────────────────────────────────────
//
// Typed reads, writes, and enumeration over any `NativeStore`.  Each read picks
// the destination representation and read flags for its type, then hands off
// to the negotiation engine; multi-strings go through the codec on top.
//
// Every `get_*` has a `try_get_*` twin that turns NotFound into `Ok(None)`
// without signalling it, so a `Panic` or `Abort` policy does not fire for a
// value that is merely absent.

use std::sync::Arc;

use crate::{
    buffer::{ByteVec, FixedBuffer, SharedWideString, ValueBuffer, ValuePayload, WideString},
    config::RegistryConfig,
    cursor::{Cursor, EnumTarget, Entries},
    error::{RegError, Result},
    multi_sz,
    negotiate::{self, ValueInfo},
    signal::{ErrorSignal, TolerateNotFound},
    status::Status,
    store::{NativeStore, NodeInfo, NodeRef},
    wire::{ReadFlags, WireType},
};

fn wide_name(name: Option<&str>) -> Option<Vec<u16>> {
    name.map(|n| n.encode_utf16().collect())
}

fn optional<T>(r: Result<T>) -> Result<Option<T>> {
    match r {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Typed access to the values and children of nodes in `S`.
///
/// Nodes are passed in as borrowed `NodeRef`s; the facade never opens or
/// closes them.
pub struct Registry<S: NativeStore> {
    store: S,
    config: RegistryConfig,
    signal: Arc<dyn ErrorSignal>,
}

impl<S: NativeStore> Registry<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, RegistryConfig::default())
    }

    /// Use `config`, reporting errors through `config.error_policy`.
    pub fn with_config(store: S, config: RegistryConfig) -> Self {
        let signal: Arc<dyn ErrorSignal> = Arc::new(config.error_policy);
        Self::with_signal(store, config, signal)
    }

    /// Use a custom error strategy instead of `config.error_policy`.
    pub fn with_signal(store: S, config: RegistryConfig, signal: Arc<dyn ErrorSignal>) -> Self {
        Self {
            store,
            config,
            signal,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn signal(&self) -> &dyn ErrorSignal {
        &*self.signal
    }

    fn try_read<T>(&self, read: impl FnOnce(&dyn ErrorSignal) -> Result<T>) -> Result<Option<T>> {
        let tolerant = TolerateNotFound(self.signal());
        optional(read(&tolerant))
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    fn read_with(
        &self,
        node: NodeRef,
        name: Option<&str>,
        flags: ReadFlags,
        buf: &mut dyn ValueBuffer,
        signal: &dyn ErrorSignal,
    ) -> Result<ValueInfo> {
        let name = wide_name(name);
        negotiate::read_value(&self.store, node, name.as_deref(), flags, buf, signal)
    }

    /// Read into a caller-supplied buffer with the flags for `wire_type`.
    ///
    /// Fixed buffers that are too small fail with `BufferTooSmall` carrying the
    /// size the value needs.
    pub fn read_into(
        &self,
        node: NodeRef,
        name: Option<&str>,
        wire_type: WireType,
        buf: &mut dyn ValueBuffer,
    ) -> Result<ValueInfo> {
        self.read_with(node, name, ReadFlags::for_wire_type(wire_type), buf, self.signal())
    }

    /// Read a fixed-width integer; a payload of the wrong width is INVALID_DATA.
    fn scalar_with<const N: usize>(
        &self,
        node: NodeRef,
        name: Option<&str>,
        wire_type: WireType,
        signal: &dyn ErrorSignal,
    ) -> Result<[u8; N]> {
        let mut raw = [0u8; N];
        let info = self.read_with(
            node,
            name,
            ReadFlags::for_wire_type(wire_type),
            &mut FixedBuffer::new(&mut raw),
            signal,
        )?;
        if info.data_len != N {
            return Err(signal.signal(RegError::from_status(Status::INVALID_DATA, "RegGetValueW")));
        }
        Ok(raw)
    }

    pub fn get_dword(&self, node: NodeRef, name: Option<&str>) -> Result<u32> {
        self.scalar_with::<4>(node, name, WireType::Dword, self.signal())
            .map(u32::from_le_bytes)
    }

    pub fn try_get_dword(&self, node: NodeRef, name: Option<&str>) -> Result<Option<u32>> {
        self.try_read(|s| self.scalar_with::<4>(node, name, WireType::Dword, s).map(u32::from_le_bytes))
    }

    pub fn get_qword(&self, node: NodeRef, name: Option<&str>) -> Result<u64> {
        self.scalar_with::<8>(node, name, WireType::Qword, self.signal())
            .map(u64::from_le_bytes)
    }

    pub fn try_get_qword(&self, node: NodeRef, name: Option<&str>) -> Result<Option<u64>> {
        self.try_read(|s| self.scalar_with::<8>(node, name, WireType::Qword, s).map(u64::from_le_bytes))
    }

    fn string_with(
        &self,
        node: NodeRef,
        name: Option<&str>,
        wire_type: WireType,
        signal: &dyn ErrorSignal,
    ) -> Result<String> {
        let mut buf = WideString::with_capacity_chars(self.config.string_buffer_chars)
            .map_err(|e| signal.signal(e))?;
        self.read_with(node, name, ReadFlags::for_wire_type(wire_type), &mut buf, signal)?;
        Ok(buf.to_string_lossy())
    }

    /// Read REG_SZ or REG_EXPAND_SZ text verbatim.
    pub fn get_string(&self, node: NodeRef, name: Option<&str>) -> Result<String> {
        self.string_with(node, name, WireType::String, self.signal())
    }

    pub fn try_get_string(&self, node: NodeRef, name: Option<&str>) -> Result<Option<String>> {
        self.try_read(|s| self.string_with(node, name, WireType::String, s))
    }

    /// Read REG_SZ or REG_EXPAND_SZ text with `%VAR%` placeholders expanded.
    pub fn get_expanded_string(&self, node: NodeRef, name: Option<&str>) -> Result<String> {
        self.string_with(node, name, WireType::ExpandString, self.signal())
    }

    pub fn try_get_expanded_string(
        &self,
        node: NodeRef,
        name: Option<&str>,
    ) -> Result<Option<String>> {
        self.try_read(|s| self.string_with(node, name, WireType::ExpandString, s))
    }

    fn shared_string_with(
        &self,
        node: NodeRef,
        name: Option<&str>,
        signal: &dyn ErrorSignal,
    ) -> Result<Arc<str>> {
        let mut buf = SharedWideString::with_capacity_chars(self.config.string_buffer_chars)
            .map_err(|e| signal.signal(e))?;
        self.read_with(node, name, ReadFlags::for_wire_type(WireType::String), &mut buf, signal)?;
        Ok(buf.into_shared())
    }

    /// `get_string`, returned as a shared allocation.
    pub fn get_shared_string(&self, node: NodeRef, name: Option<&str>) -> Result<Arc<str>> {
        self.shared_string_with(node, name, self.signal())
    }

    pub fn try_get_shared_string(
        &self,
        node: NodeRef,
        name: Option<&str>,
    ) -> Result<Option<Arc<str>>> {
        self.try_read(|s| self.shared_string_with(node, name, s))
    }

    fn multi_string_with(
        &self,
        node: NodeRef,
        name: Option<&str>,
        signal: &dyn ErrorSignal,
    ) -> Result<Vec<String>> {
        let mut buf = ByteVec::with_capacity(self.config.binary_buffer_bytes)
            .map_err(|e| signal.signal(e))?;
        self.read_with(node, name, ReadFlags::for_wire_type(WireType::MultiString), &mut buf, signal)?;
        multi_sz::decode_bytes(buf.as_bytes()).map_err(|e| signal.signal(e))
    }

    /// Read a REG_MULTI_SZ list.  An empty stored list reads back as `[""]`.
    pub fn get_multi_string(&self, node: NodeRef, name: Option<&str>) -> Result<Vec<String>> {
        self.multi_string_with(node, name, self.signal())
    }

    pub fn try_get_multi_string(
        &self,
        node: NodeRef,
        name: Option<&str>,
    ) -> Result<Option<Vec<String>>> {
        self.try_read(|s| self.multi_string_with(node, name, s))
    }

    fn binary_with(
        &self,
        node: NodeRef,
        name: Option<&str>,
        wire_type: WireType,
        signal: &dyn ErrorSignal,
    ) -> Result<Vec<u8>> {
        let mut buf = ByteVec::with_capacity(self.config.binary_buffer_bytes)
            .map_err(|e| signal.signal(e))?;
        self.read_with(node, name, ReadFlags::for_wire_type(wire_type), &mut buf, signal)?;
        Ok(buf.into_vec())
    }

    /// Raw payload bytes of a value read with the flags for `wire_type`.
    pub fn get_binary(
        &self,
        node: NodeRef,
        name: Option<&str>,
        wire_type: WireType,
    ) -> Result<Vec<u8>> {
        self.binary_with(node, name, wire_type, self.signal())
    }

    pub fn try_get_binary(
        &self,
        node: NodeRef,
        name: Option<&str>,
        wire_type: WireType,
    ) -> Result<Option<Vec<u8>>> {
        self.try_read(|s| self.binary_with(node, name, wire_type, s))
    }

    fn value_type_with(
        &self,
        node: NodeRef,
        name: Option<&str>,
        signal: &dyn ErrorSignal,
    ) -> Result<WireType> {
        let name = wide_name(name);
        let outcome = self.store.get_value(
            node,
            name.as_deref(),
            ReadFlags::RT_ANY | ReadFlags::NOEXPAND,
            None,
        );
        signal.from_status(outcome.status, "RegGetValueW")?;
        Ok(WireType::from_raw(outcome.raw_type))
    }

    /// Stored type of a value, without reading its payload.
    pub fn value_type(&self, node: NodeRef, name: Option<&str>) -> Result<WireType> {
        self.value_type_with(node, name, self.signal())
    }

    pub fn try_value_type(&self, node: NodeRef, name: Option<&str>) -> Result<Option<WireType>> {
        self.try_read(|s| self.value_type_with(node, name, s))
    }

    // ── Writes ────────────────────────────────────────────────────────────────

    fn write(
        &self,
        node: NodeRef,
        name: Option<&str>,
        wire_type: WireType,
        payload: &[u8],
    ) -> Result<()> {
        let name = wide_name(name);
        negotiate::write_value(&self.store, node, name.as_deref(), wire_type, payload, self.signal())
    }

    /// Store whatever `source` holds, e.g. a buffer filled by an earlier read.
    pub fn write_from(
        &self,
        node: NodeRef,
        name: Option<&str>,
        wire_type: WireType,
        source: &dyn ValuePayload,
    ) -> Result<()> {
        self.write(node, name, wire_type, &source.payload())
    }

    pub fn set_dword(&self, node: NodeRef, name: Option<&str>, value: u32) -> Result<()> {
        self.write(node, name, WireType::Dword, &value.to_le_bytes())
    }

    pub fn set_qword(&self, node: NodeRef, name: Option<&str>, value: u64) -> Result<()> {
        self.write(node, name, WireType::Qword, &value.to_le_bytes())
    }

    pub fn set_string(&self, node: NodeRef, name: Option<&str>, value: &str) -> Result<()> {
        self.write_from(node, name, WireType::String, &WideString::from(value))
    }

    pub fn set_expanded_string(&self, node: NodeRef, name: Option<&str>, value: &str) -> Result<()> {
        self.write_from(node, name, WireType::ExpandString, &WideString::from(value))
    }

    /// Store a REG_MULTI_SZ list.  Entries may not contain `'\0'`.
    pub fn set_multi_string<T: AsRef<str>>(
        &self,
        node: NodeRef,
        name: Option<&str>,
        values: &[T],
    ) -> Result<()> {
        let encoded = multi_sz::encode_bytes(values).map_err(|e| self.signal().signal(e))?;
        self.write(node, name, WireType::MultiString, &encoded)
    }

    /// Store `bytes` verbatim under any wire type.
    pub fn set_binary(
        &self,
        node: NodeRef,
        name: Option<&str>,
        wire_type: WireType,
        bytes: &[u8],
    ) -> Result<()> {
        self.write(node, name, wire_type, bytes)
    }

    pub fn delete_value(&self, node: NodeRef, name: Option<&str>) -> Result<()> {
        let name = wide_name(name);
        let status = self.store.delete_value(node, name.as_deref());
        tracing::trace!(?node, %status, "RegDeleteValueW");
        self.signal().from_status(status, "RegDeleteValueW")
    }

    // ── Enumeration ───────────────────────────────────────────────────────────

    /// Cursor on the first child key of `node`.
    pub fn key_cursor(&self, node: NodeRef) -> Result<Cursor<'_, S>> {
        Cursor::begin(
            &self.store,
            node,
            EnumTarget::Keys,
            self.config.name_buffer_chars,
            self.signal(),
        )
    }

    /// Cursor on the first value of `node`.
    pub fn value_cursor(&self, node: NodeRef) -> Result<Cursor<'_, S>> {
        Cursor::begin(
            &self.store,
            node,
            EnumTarget::Values,
            self.config.name_buffer_chars,
            self.signal(),
        )
    }

    /// The end cursor every walk over `node` finishes at.
    pub fn end_cursor(&self, node: NodeRef, target: EnumTarget) -> Cursor<'_, S> {
        Cursor::end(&self.store, node, target, self.signal())
    }

    pub fn keys(&self, node: NodeRef) -> Result<Entries<'_, S>> {
        self.key_cursor(node).map(Entries::new)
    }

    pub fn values(&self, node: NodeRef) -> Result<Entries<'_, S>> {
        self.value_cursor(node).map(Entries::new)
    }

    pub fn info(&self, node: NodeRef) -> Result<NodeInfo> {
        let (status, info) = self.store.query_info(node);
        self.signal().from_status(status, "RegQueryInfoKeyW")?;
        Ok(info)
    }

    pub fn child_key_count(&self, node: NodeRef) -> Result<u32> {
        self.info(node).map(|i| i.child_keys)
    }

    pub fn child_value_count(&self, node: NodeRef) -> Result<u32> {
        self.info(node).map(|i| i.values)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use proptest::prelude::*;

    use super::*;
    use crate::{error::ErrorKind, signal::ErrorPolicy, store::MemoryStore};

    fn registry() -> (Registry<MemoryStore>, NodeRef) {
        let store = MemoryStore::new();
        let node = store.create_key(store.root(), r"Software\regkit\tests").expect("create");
        (Registry::new(store), node)
    }

    proptest! {
        #[test]
        fn dword_round_trip(v in any::<u32>()) {
            let (reg, node) = registry();
            reg.set_dword(node, Some("d"), v).expect("set");
            prop_assert_eq!(reg.get_dword(node, Some("d")).expect("get"), v);
        }

        #[test]
        fn qword_round_trip(v in any::<u64>()) {
            let (reg, node) = registry();
            reg.set_qword(node, Some("q"), v).expect("set");
            prop_assert_eq!(reg.get_qword(node, Some("q")).expect("get"), v);
        }

        #[test]
        fn binary_reads_settle_within_two_calls(len in 0usize..=65_536) {
            let (reg, node) = registry();
            let data: Vec<u8> = (0..len).map(|i| (i % 253) as u8).collect();
            reg.set_binary(node, Some("b"), WireType::Binary, &data).expect("set");
            reg.store().reset_counters();
            let read = reg.get_binary(node, Some("b"), WireType::Binary).expect("get");
            prop_assert!(reg.store().get_value_calls() <= 2);
            prop_assert_eq!(read, data);
        }

        #[test]
        fn string_reads_settle_within_two_calls(chars in 0usize..=32_767) {
            let (reg, node) = registry();
            let text = "z".repeat(chars);
            reg.set_string(node, None, &text).expect("set");
            reg.store().reset_counters();
            let read = reg.get_string(node, None).expect("get");
            prop_assert!(reg.store().get_value_calls() <= 2);
            prop_assert_eq!(read, text);
        }
    }

    #[test]
    fn mismatched_scalar_reads_are_unsupported() {
        let (reg, node) = registry();
        reg.set_dword(node, Some("d"), 7).expect("set");
        reg.set_qword(node, Some("q"), 7).expect("set");
        assert_eq!(
            reg.get_qword(node, Some("d")).unwrap_err().kind(),
            ErrorKind::UnsupportedType
        );
        assert_eq!(
            reg.get_dword(node, Some("q")).unwrap_err().kind(),
            ErrorKind::UnsupportedType
        );
        assert_eq!(
            reg.get_string(node, Some("d")).unwrap_err().kind(),
            ErrorKind::UnsupportedType
        );
    }

    #[test]
    fn wrong_width_dword_is_invalid_data() {
        let (reg, node) = registry();
        reg.set_binary(node, Some("short"), WireType::Dword, &[1, 2]).expect("set");
        assert_eq!(
            reg.get_dword(node, Some("short")).unwrap_err().code(),
            Status::INVALID_DATA
        );
    }

    #[test]
    fn string_round_trips() {
        let (reg, node) = registry();
        for s in [".", "", "Hello there!"] {
            reg.set_string(node, Some("s"), s).expect("set");
            assert_eq!(reg.get_string(node, Some("s")).expect("get"), s);
            assert_eq!(&*reg.get_shared_string(node, Some("s")).expect("get"), s);
        }
        reg.set_string(node, Some("s"), "\0").expect("set");
        assert_eq!(reg.get_string(node, Some("s")).expect("get"), "");
    }

    #[test]
    fn default_value_is_addressed_by_none() {
        let (reg, node) = registry();
        reg.set_string(node, None, "default").expect("set");
        assert_eq!(reg.get_string(node, None).expect("get"), "default");
        assert_eq!(reg.get_string(node, Some("")).expect("get"), "default");
    }

    #[test]
    fn expanded_and_verbatim_strings() {
        let (reg, node) = registry();
        reg.store().set_env("REGKIT_HOME", r"C:\Users\me");
        reg.set_expanded_string(node, Some("p"), r"%REGKIT_HOME%\cache").expect("set");
        assert_eq!(
            reg.get_expanded_string(node, Some("p")).expect("get"),
            r"C:\Users\me\cache"
        );
        assert_eq!(reg.get_string(node, Some("p")).expect("get"), r"%REGKIT_HOME%\cache");
        assert_eq!(reg.value_type(node, Some("p")).expect("type"), WireType::ExpandString);
    }

    #[test]
    fn multi_string_laws_through_the_store() {
        let (reg, node) = registry();
        let empty: [&str; 0] = [];
        for input in [&empty[..], &[""][..], &["", ""][..]] {
            reg.set_multi_string(node, Some("m"), input).expect("set");
            assert_eq!(reg.get_multi_string(node, Some("m")).expect("get"), vec![""]);
        }
        reg.set_multi_string(node, Some("m"), &["a", "b", "c"]).expect("set");
        assert_eq!(
            reg.get_multi_string(node, Some("m")).expect("get"),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn multi_string_rejects_embedded_terminator() {
        let (reg, node) = registry();
        let err = reg.set_multi_string(node, Some("m"), &["a\0b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(reg.try_get_multi_string(node, Some("m")).expect("try"), None);
    }

    #[test]
    fn fixed_buffer_too_small_reports_exact_size() {
        let (reg, node) = registry();
        reg.set_string(node, Some("s"), "abcdef").expect("set");
        let mut storage = [0u8; 6];
        let err = reg
            .read_into(
                node,
                Some("s"),
                WireType::String,
                &mut FixedBuffer::new(&mut storage),
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegError::BufferTooSmall {
                required: 14,
                capacity: 6
            }
        );
        assert_eq!(storage, [b'a', 0, b'b', 0, b'c', 0]);
    }

    #[test]
    fn try_get_maps_missing_to_none() {
        let (reg, node) = registry();
        assert_eq!(reg.try_get_dword(node, Some("missing")).expect("try"), None);
        assert_eq!(reg.try_get_string(node, Some("missing")).expect("try"), None);
        assert_eq!(reg.try_value_type(node, Some("missing")).expect("try"), None);
        reg.set_dword(node, Some("present"), 3).expect("set");
        assert_eq!(reg.try_get_dword(node, Some("present")).expect("try"), Some(3));
        assert_eq!(
            reg.try_get_qword(node, Some("present")).unwrap_err().kind(),
            ErrorKind::UnsupportedType
        );
    }

    #[test]
    fn panic_policy_unwinds_but_try_does_not() {
        let store = MemoryStore::new();
        let root = store.root();
        let cfg = RegistryConfig {
            error_policy: ErrorPolicy::Panic,
            ..RegistryConfig::default()
        };
        let reg = Registry::with_config(store, cfg);

        assert_eq!(reg.try_get_string(root, Some("missing")).expect("try"), None);

        let caught = catch_unwind(AssertUnwindSafe(|| {
            let _ = reg.get_string(root, Some("missing"));
        }))
        .expect_err("must unwind");
        let err = caught.downcast::<RegError>().expect("payload is RegError");
        assert!(err.is_not_found());
    }

    #[test]
    fn oversized_configured_buffers_are_out_of_memory() {
        let store = MemoryStore::new();
        let root = store.root();
        let cfg = RegistryConfig::from_json(
            r#"{"string_buffer_chars": 18446744073709551615, "binary_buffer_bytes": 18446744073709551615}"#,
        )
        .expect("parse");
        let reg = Registry::with_config(store, cfg);
        reg.set_string(root, Some("s"), "text").expect("set");
        reg.set_binary(root, Some("b"), WireType::Binary, &[1]).expect("set");

        for err in [
            reg.get_string(root, Some("s")).unwrap_err(),
            reg.get_shared_string(root, Some("s")).unwrap_err(),
            reg.get_binary(root, Some("b"), WireType::Binary).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        }
    }

    #[derive(Debug, Default)]
    struct Counting(std::sync::atomic::AtomicUsize);

    impl ErrorSignal for Counting {
        fn signal(&self, err: RegError) -> RegError {
            self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            err
        }
    }

    #[test]
    fn custom_signal_sees_every_failure() {
        let counting = Arc::new(Counting::default());
        let store = MemoryStore::new();
        let root = store.root();
        let reg = Registry::with_signal(store, RegistryConfig::default(), counting.clone());
        let _ = reg.get_dword(root, Some("a"));
        let _ = reg.delete_value(root, Some("b"));
        let _ = reg.try_get_dword(root, Some("c"));
        assert_eq!(counting.0.load(std::sync::atomic::Ordering::Relaxed), 2);
    }

    #[test]
    fn buffers_copy_between_values() {
        let (reg, node) = registry();
        reg.set_string(node, Some("from"), "copied text").expect("set");

        let mut shared = SharedWideString::new();
        reg.read_into(node, Some("from"), WireType::String, &mut shared)
            .expect("read");
        reg.write_from(node, Some("to"), WireType::String, &shared).expect("write");
        assert_eq!(reg.get_string(node, Some("to")).expect("get"), "copied text");

        let mut bytes = ByteVec::new();
        reg.read_into(node, Some("from"), WireType::String, &mut bytes)
            .expect("read");
        reg.write_from(node, Some("raw"), WireType::Binary, &bytes).expect("write");
        assert_eq!(
            reg.get_binary(node, Some("raw"), WireType::Binary).expect("get"),
            bytes.into_vec()
        );
    }

    #[test]
    fn delete_value_then_not_found() {
        let (reg, node) = registry();
        reg.set_qword(node, Some("q"), 1).expect("set");
        reg.delete_value(node, Some("q")).expect("delete");
        assert!(reg.delete_value(node, Some("q")).unwrap_err().is_not_found());
        assert!(reg.get_qword(node, Some("q")).unwrap_err().is_not_found());
    }

    #[test]
    fn enumerates_keys_and_values() {
        let (reg, node) = registry();
        for name in ["alpha", "beta"] {
            reg.store().create_key(node, name).expect("create");
        }
        reg.set_dword(node, Some("count"), 1).expect("set");
        reg.set_string(node, Some("label"), "x").expect("set");

        let keys: Vec<String> = reg
            .keys(node)
            .expect("keys")
            .map(|e| e.expect("entry").name)
            .collect();
        assert_eq!(keys, vec!["alpha", "beta"]);

        let values: Vec<(String, Option<WireType>)> = reg
            .values(node)
            .expect("values")
            .map(|e| e.expect("entry"))
            .map(|e| (e.name, e.wire_type))
            .collect();
        assert_eq!(
            values,
            vec![
                ("count".to_owned(), Some(WireType::Dword)),
                ("label".to_owned(), Some(WireType::String)),
            ]
        );

        assert_eq!(reg.child_key_count(node).expect("count"), 2);
        assert_eq!(reg.child_value_count(node).expect("count"), 2);
    }

    #[test]
    fn walk_ends_at_the_end_cursor() {
        let (reg, node) = registry();
        reg.store().create_key(node, "only").expect("create");
        let mut cursor = reg.key_cursor(node).expect("begin");
        assert_ne!(cursor, reg.end_cursor(node, EnumTarget::Keys));
        cursor.advance(1).expect("advance");
        assert_eq!(cursor, reg.end_cursor(node, EnumTarget::Keys));
        assert_eq!(cursor, reg.end_cursor(reg.store().root(), EnumTarget::Keys));
    }

    #[test]
    fn concurrent_readers_share_a_node() {
        let (reg, node) = registry();
        reg.set_string(node, Some("shared"), "value").expect("set");
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        assert_eq!(reg.get_string(node, Some("shared")).expect("get"), "value");
                    }
                });
            }
        });
    }
}
