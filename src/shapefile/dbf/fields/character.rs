use encoding::{EncoderTrap, EncodingRef};

use crate::shapefile::dbf::{DbfError, DbfField};
use crate::shapefile::layout::decode_fixed_string;

pub const BLANK: u8 = b' ';

/// Trailing blanks are padding. An all-blank slot is absent.
pub fn decode(bytes: &[u8], encoding: EncodingRef) -> Option<String> {
    let s = decode_fixed_string(bytes, encoding);
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Left-aligns `value`, padding with blanks.
pub fn encode(field: &DbfField, value: Option<&str>, encoding: EncodingRef, out: &mut Vec<u8>) -> Result<(), DbfError> {
    let bytes = match value {
        None => vec![],
        Some(s) => encoding.encode(s, EncoderTrap::Strict)
            .map_err(|err| DbfError::EncodeError(format!("Field {}: {:?} is not valid {}: {}", field.name, s, encoding.name(), err)))?,
    };

    if bytes.len() > field.len {
        return Err(DbfError::Overflow { field: field.name.clone(), width: field.len, needed: bytes.len() });
    }

    out.extend_from_slice(&bytes);
    out.resize(out.len() + field.len - bytes.len(), BLANK);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use encoding::all::{ASCII, UTF_8, WINDOWS_1252};

    #[test]
    fn test_decode() {
        assert_eq!(Some("caf\u{e9}".to_string()), decode(b"caf\xe9   ", WINDOWS_1252));
        assert_eq!(Some("  x".to_string()), decode(b"  x ", UTF_8));
        assert_eq!(None, decode(b"    ", UTF_8));
    }

    #[test]
    fn test_encode_pads() {
        let mut out = Vec::new();
        encode(&DbfField::character("NAME", 6), Some("caf\u{e9}"), UTF_8, &mut out).unwrap();
        encode(&DbfField::character("NAME", 3), None, UTF_8, &mut out).unwrap();
        assert_eq!(b"caf\xc3\xa9    ".to_vec(), out);
    }

    #[test]
    fn test_encode_overflow() {
        let mut out = Vec::new();
        match encode(&DbfField::character("NAME", 4), Some("caf\u{e9}"), UTF_8, &mut out) {
            Err(DbfError::Overflow { width: 4, needed: 5, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_encode_unencodable() {
        let mut out = Vec::new();
        assert!(encode(&DbfField::character("NAME", 10), Some("caf\u{e9}"), ASCII, &mut out).is_err());
    }
}
