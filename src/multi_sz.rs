// ── Multi-string codec ────────────────────────────────────────────────────────
//
// REG_MULTI_SZ layout: every string is followed by one terminator, and one
// more terminator closes the list:
//
//     "a\0b\0c\0\0"      ["a", "b", "c"]
//     "\0\0"             [""]   and also []
//
// The format cannot tell an empty list from a list holding one empty string.
// Encoding writes both as "\0\0"; decoding always yields [""] for it.  Empty
// strings right before the closing terminators are dropped the same way.
// Empty strings in the middle of the list survive.

use crate::error::{RegError, Result};

const TERMINATOR: u16 = 0;

/// Flatten `strings` into a double-terminated UTF-16 buffer.
///
/// A string with an embedded terminator would split into two on read-back,
/// so it is rejected.
pub fn encode<S: AsRef<str>>(strings: &[S]) -> Result<Vec<u16>> {
    let mut out = Vec::new();
    for s in strings {
        let s = s.as_ref();
        if s.contains('\0') {
            return Err(RegError::InvalidArgument(
                "multi-string entry contains an embedded terminator",
            ));
        }
        out.extend(s.encode_utf16());
        out.push(TERMINATOR);
    }
    if strings.is_empty() {
        // Same bytes as [""]
        out.push(TERMINATOR);
    }
    out.push(TERMINATOR);
    Ok(out)
}

/// `encode`, serialised as little-endian bytes ready for the store.
pub fn encode_bytes<S: AsRef<str>>(strings: &[S]) -> Result<Vec<u8>> {
    Ok(encode(strings)?
        .into_iter()
        .flat_map(u16::to_le_bytes)
        .collect())
}

/// Split a multi-string buffer into its strings.
///
/// Never returns an empty list: buffers too short to hold the closing pair,
/// and buffers holding only terminators, decode to `[""]`.  Invalid UTF-16 is
/// replaced with U+FFFD.
pub fn decode(units: &[u16]) -> Vec<String> {
    if units.len() < 2 {
        return vec![String::new()];
    }
    let end = units
        .iter()
        .rposition(|&u| u != TERMINATOR)
        .map_or(0, |i| i + 1);
    if end == 0 {
        return vec![String::new()];
    }
    units[..end]
        .split(|&u| u == TERMINATOR)
        .map(String::from_utf16_lossy)
        .collect()
}

/// `decode` over little-endian bytes as read from the store.
pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<String>> {
    if bytes.len() % 2 != 0 {
        return Err(RegError::InvalidArgument(
            "multi-string payload is not a whole number of UTF-16 units",
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    Ok(decode(&units))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    fn round_trip(strings: &[&str]) -> Vec<String> {
        decode(&encode(strings).expect("encode"))
    }

    #[test]
    fn empty_list_encodes_as_double_terminator() {
        assert_eq!(encode::<&str>(&[]).expect("encode"), vec![0, 0]);
        assert_eq!(encode(&[""]).expect("encode"), vec![0, 0]);
    }

    #[test]
    fn empty_list_reads_back_as_one_empty_string() {
        let expected = vec![String::new()];
        assert_eq!(round_trip(&[]), expected);
        assert_eq!(round_trip(&[""]), expected);
        assert_eq!(round_trip(&["", ""]), expected);
    }

    #[test]
    fn general_round_trip() {
        assert_eq!(round_trip(&["a", "b", "c"]), vec!["a", "b", "c"]);
        assert_eq!(encode(&["a", "b", "c"]).expect("encode"), wide("a\0b\0c\0\0"));
    }

    #[test]
    fn trailing_empty_strings_are_dropped() {
        assert_eq!(round_trip(&["a", ""]), vec!["a"]);
        assert_eq!(round_trip(&["a", "", ""]), vec!["a"]);
    }

    #[test]
    fn interior_and_leading_empty_strings_survive() {
        assert_eq!(round_trip(&["a", "", "b"]), vec!["a", "", "b"]);
        assert_eq!(round_trip(&["", "a"]), vec!["", "a"]);
    }

    #[test]
    fn short_buffers_are_degenerate_not_errors() {
        assert_eq!(decode(&[]), vec![String::new()]);
        assert_eq!(decode(&[u16::from(b'x')]), vec![String::new()]);
    }

    #[test]
    fn missing_terminators_are_tolerated() {
        assert_eq!(decode(&wide("ab")), vec!["ab"]);
        assert_eq!(decode(&wide("ab\0cd")), vec!["ab", "cd"]);
    }

    #[test]
    fn embedded_terminator_is_rejected() {
        assert_eq!(
            encode(&["a\0b"]).unwrap_err().kind(),
            crate::error::ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn odd_byte_count_is_rejected() {
        assert!(decode_bytes(&[b'a', 0, 0]).is_err());
        assert_eq!(
            decode_bytes(&encode_bytes(&["x", "yz"]).expect("encode")).expect("decode"),
            vec!["x", "yz"]
        );
    }
}
