use crate::shapefile::dbf::Logical;

/// Written for `Logical::Absent`.
pub const BLANK: u8 = b' ';

/// Reads a Logical slot of any width. Only the first character that isn't
/// whitespace counts.
pub fn decode(bytes: &[u8]) -> Logical {
    match bytes.iter().find(|&&b| !b.is_ascii_whitespace() && b != 0) {
        Some(b'T') | Some(b't') | Some(b'Y') | Some(b'y') => Logical::True,
        Some(b'F') | Some(b'f') | Some(b'N') | Some(b'n') => Logical::False,
        _ => Logical::Absent,
    }
}

/// Writes exactly one byte.
pub fn encode(value: Logical, out: &mut Vec<u8>) {
    out.push(match value {
        Logical::True => b'T',
        Logical::False => b'F',
        Logical::Absent => BLANK,
    });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode() {
        for bytes in [ &b"T"[..], b"t ", b"Y", b"y", b"  T" ].iter() {
            assert_eq!(Logical::True, decode(bytes), "{:?}", bytes);
        }
        for bytes in [ &b"F"[..], b"f", b"N", b"n" ].iter() {
            assert_eq!(Logical::False, decode(bytes), "{:?}", bytes);
        }
        for bytes in [ &b""[..], b"  ", b"X", b"?", b"\0" ].iter() {
            assert_eq!(Logical::Absent, decode(bytes), "{:?}", bytes);
        }
    }

    #[test]
    fn test_encode_writes_one_byte() {
        let mut out = Vec::new();
        encode(Logical::True, &mut out);
        encode(Logical::False, &mut out);
        encode(Logical::Absent, &mut out);
        assert_eq!(b"TF ".to_vec(), out);
    }
}
