// ── Value read/write negotiation ──────────────────────────────────────────────
//
// A read does not know the payload size up front.  The engine asks the store
// to fill whatever the destination currently holds and reacts to the status:
//
//   SUCCESS    done; a growable destination is resized to the exact reported
//              size (a repair, not a second call); an empty fixed
//              destination with a non-empty payload is BufferTooSmall
//   MORE_DATA  growable: resize to the reported size and ask again
//              fixed:    BufferTooSmall carrying the reported size
//   other      translated and signalled unchanged
//
// Growth always targets the exact reported size, so a read settles within
// two calls unless the value changes underneath it.  A zero-capacity
// destination is passed as "no pointer", which the store answers with the
// size alone; that counts as the first of the two calls.

use crate::{
    buffer::ValueBuffer,
    error::{RegError, Result},
    signal::ErrorSignal,
    status::Status,
    store::{NativeStore, NodeRef},
    wire::{ReadFlags, WireType},
};

const GET_VALUE: &str = "RegGetValueW";
const SET_VALUE: &str = "RegSetValueExW";

/// What a completed read reports about the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueInfo {
    /// Type the store returned (REG_SZ for an expanded REG_EXPAND_SZ).
    pub wire_type: WireType,
    /// Payload size in bytes, before any trim.
    pub data_len: usize,
}

/// Read the value `name` of `node` into `buf`, growing `buf` as needed.
pub fn read_value<S: NativeStore + ?Sized>(
    store: &S,
    node: NodeRef,
    name: Option<&[u16]>,
    flags: ReadFlags,
    buf: &mut dyn ValueBuffer,
    signal: &dyn ErrorSignal,
) -> Result<ValueInfo> {
    if buf.supports_prepare() {
        buf.prepare();
    }

    loop {
        let capacity = buf.byte_capacity();
        let outcome = store.get_value(node, name, flags, buf.writable());
        let reported = outcome.data_len as usize;
        tracing::trace!(
            ?node,
            capacity,
            reported,
            status = %outcome.status,
            "{GET_VALUE}"
        );

        match outcome.status {
            Status::SUCCESS => {
                if buf.supports_growth() {
                    if capacity == 0 && reported > 0 {
                        // Size query only: nothing was copied yet.
                        grow(buf, reported, signal)?;
                        continue;
                    }
                    if reported != capacity {
                        tracing::debug!(from = capacity, to = reported, "resizing to payload");
                        grow(buf, reported, signal)?;
                    }
                } else if reported > capacity {
                    // A zero-length fixed destination was sent as a size query.
                    return Err(signal.signal(RegError::BufferTooSmall {
                        required: reported,
                        capacity,
                    }));
                }
                if buf.supports_trim() {
                    buf.trim();
                }
                signal.success()?;
                return Ok(ValueInfo {
                    wire_type: WireType::from_raw(outcome.raw_type),
                    data_len: reported,
                });
            }
            Status::MORE_DATA if buf.supports_growth() => {
                tracing::debug!(from = capacity, to = reported, "growing for retry");
                grow(buf, reported, signal)?;
            }
            Status::MORE_DATA => {
                return Err(signal.signal(RegError::BufferTooSmall {
                    required: reported,
                    capacity,
                }));
            }
            status => {
                signal.from_status(status, GET_VALUE)?;
                // A strategy that maps a failure to success has nothing to
                // return; report the raw status instead.
                return Err(RegError::from_status(status, GET_VALUE));
            }
        }
    }
}

fn grow(buf: &mut dyn ValueBuffer, bytes: usize, signal: &dyn ErrorSignal) -> Result<()> {
    buf.grow_to(bytes).map_err(|e| signal.signal(e))
}

/// Store `payload` as the value `name` of `node` with type `wire_type`.
///
/// One call, no retry.
pub fn write_value<S: NativeStore + ?Sized>(
    store: &S,
    node: NodeRef,
    name: Option<&[u16]>,
    wire_type: WireType,
    payload: &[u8],
    signal: &dyn ErrorSignal,
) -> Result<()> {
    let status = store.set_value(node, name, wire_type.as_raw(), payload);
    tracing::trace!(?node, ?wire_type, len = payload.len(), %status, "{SET_VALUE}");
    signal.from_status(status, SET_VALUE)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
