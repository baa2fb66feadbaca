//! Composite key codec.
//!
//! A composite key is an object-type tag followed by an ordered list of
//! string parts, laid out as
//!
//! ```text
//! 0x00 <object_type> 0x00 <part_1> 0x00 ... <part_n> 0x00
//! ```
//!
//! Every component is NUL-terminated, so the encoding of `[p1..pk]` is a
//! byte prefix of the encoding of `[p1..pk, p(k+1), ...]` and a range scan
//! over a partial key yields exactly the keys whose parts start with it, in
//! lexicographic order. Components containing U+0000 are rejected rather
//! than escaped.

use std::fmt;

use crate::error::{StateError, StateResult};

const SEPARATOR: u8 = 0x00;

/// Upper bound for partial-key scans. 0xFF never occurs in UTF-8 text.
const RANGE_END: u8 = 0xff;

/// An encoded composite key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey(Vec<u8>);

impl CompositeKey {
    /// Encode `object_type` and `parts`. Fewer parts produce a partial key
    /// suitable for [`CompositeKey::scan_range`].
    pub fn new<S: AsRef<str>>(object_type: &str, parts: &[S]) -> StateResult<Self> {
        if object_type.is_empty() {
            return Err(StateError::InvalidKeyPart {
                part: String::new(),
                reason: "object type must not be empty",
            });
        }
        check_component(object_type)?;

        let len = 2 + object_type.len() + parts.iter().map(|p| p.as_ref().len() + 1).sum::<usize>();
        let mut bytes = Vec::with_capacity(len);
        bytes.push(SEPARATOR);
        bytes.extend_from_slice(object_type.as_bytes());
        bytes.push(SEPARATOR);
        for part in parts {
            let part = part.as_ref();
            check_component(part)?;
            bytes.extend_from_slice(part.as_bytes());
            bytes.push(SEPARATOR);
        }
        Ok(Self(bytes))
    }

    /// Wrap bytes read back from the ledger. No validation happens until
    /// [`CompositeKey::decode`].
    pub fn from_raw(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn decode(&self) -> StateResult<(String, Vec<String>)> {
        decode(&self.0)
    }

    /// Half-open byte range `[start, end)` covering this key and every key
    /// that extends it with further parts.
    pub fn scan_range(&self) -> (Vec<u8>, Vec<u8>) {
        let start = self.0.clone();
        let mut end = self.0.clone();
        end.push(RANGE_END);
        (start, end)
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Ok((object_type, parts)) => write!(f, "{object_type}[{}]", parts.join(", ")),
            Err(_) => write!(f, "{}", String::from_utf8_lossy(&self.0).escape_debug()),
        }
    }
}

fn check_component(component: &str) -> StateResult<()> {
    if component.as_bytes().contains(&SEPARATOR) {
        return Err(StateError::InvalidKeyPart {
            part: component.to_string(),
            reason: "must not contain U+0000",
        });
    }
    Ok(())
}

/// Split encoded key bytes back into `(object_type, parts)`.
pub fn decode(bytes: &[u8]) -> StateResult<(String, Vec<String>)> {
    let rest = bytes
        .strip_prefix(&[SEPARATOR])
        .ok_or_else(|| StateError::MalformedKey("missing leading separator".to_string()))?;
    let body = rest
        .strip_suffix(&[SEPARATOR])
        .ok_or_else(|| StateError::MalformedKey("unterminated component".to_string()))?;

    let mut components = body.split(|b| *b == SEPARATOR).map(|component| {
        String::from_utf8(component.to_vec())
            .map_err(|e| StateError::MalformedKey(format!("component is not UTF-8: {e}")))
    });

    // split() always yields at least one item.
    let object_type = components.next().transpose()?.unwrap_or_default();
    if object_type.is_empty() {
        return Err(StateError::MalformedKey("empty object type".to_string()));
    }
    let parts = components.collect::<StateResult<Vec<_>>>()?;
    Ok((object_type, parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() {
        let key = CompositeKey::new("APP_BUNDLE", &["d1", "b1"]).unwrap();
        assert_eq!(key.as_bytes(), b"\0APP_BUNDLE\0d1\0b1\0");
    }

    #[test]
    fn decode_inverts_encode() {
        for parts in [vec![], vec![""], vec!["d1"], vec!["d1", "b1"], vec!["a b", "ü", ""]] {
            let key = CompositeKey::new("APP_DESCRIPTOR", &parts).unwrap();
            let (object_type, decoded) = key.decode().unwrap();
            assert_eq!(object_type, "APP_DESCRIPTOR");
            assert_eq!(decoded, parts);
        }
    }

    #[test]
    fn partial_key_is_byte_prefix() {
        let partial = CompositeKey::new("APP_BUNDLE", &["d1"]).unwrap();
        let full = CompositeKey::new("APP_BUNDLE", &["d1", "b1"]).unwrap();
        assert!(full.as_bytes().starts_with(partial.as_bytes()));

        // "d10" shares the text prefix "d1" but not the encoded one.
        let sibling = CompositeKey::new("APP_BUNDLE", &["d10", "b1"]).unwrap();
        assert!(!sibling.as_bytes().starts_with(partial.as_bytes()));
    }

    #[test]
    fn scan_range_bounds_extensions() {
        let partial = CompositeKey::new("APP_BUNDLE", &["d1"]).unwrap();
        let (start, end) = partial.scan_range();
        let inside = CompositeKey::new("APP_BUNDLE", &["d1", "\u{10FFFF}"]).unwrap();
        let outside = CompositeKey::new("APP_BUNDLE", &["d10"]).unwrap();

        assert!(start.as_slice() <= inside.as_bytes() && inside.as_bytes() < end.as_slice());
        assert!(!(start.as_slice() <= outside.as_bytes() && outside.as_bytes() < end.as_slice()));
    }

    #[test]
    fn distinct_splits_do_not_collide() {
        let a = CompositeKey::new("T", &["ab", "c"]).unwrap();
        let b = CompositeKey::new("T", &["a", "bc"]).unwrap();
        let c = CompositeKey::new("T", &["abc"]).unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn separator_in_part_is_rejected() {
        let err = CompositeKey::new("T", &["bad\0part"]).unwrap_err();
        assert!(matches!(err, StateError::InvalidKeyPart { .. }));

        let err = CompositeKey::new::<&str>("", &[]).unwrap_err();
        assert!(matches!(err, StateError::InvalidKeyPart { .. }));
    }

    #[test]
    fn malformed_input_fails() {
        assert!(matches!(decode(b"T\0a\0"), Err(StateError::MalformedKey(_))));
        assert!(matches!(decode(b"\0T\0a"), Err(StateError::MalformedKey(_))));
        assert!(matches!(decode(b"\0\0"), Err(StateError::MalformedKey(_))));
        assert!(matches!(decode(b"\0T\0\xff\0"), Err(StateError::MalformedKey(_))));
        assert!(matches!(decode(b""), Err(StateError::MalformedKey(_))));
    }

    #[test]
    fn display_is_readable() {
        let key = CompositeKey::new("APP_BUNDLE", &["d1", "b1"]).unwrap();
        assert_eq!(key.to_string(), "APP_BUNDLE[d1, b1]");
    }
}
