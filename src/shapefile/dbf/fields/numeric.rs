use regex::Regex;

use crate::shapefile::dbf::{DbfError, DbfField, FieldType, FieldValue};

pub const BLANK: u8 = b' ';

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

fn holds_integers(field: &DbfField) -> bool {
    field.field_type == FieldType::Numeric && field.decimal_count == 0
}

/// Reads a right-aligned number.
///
/// Blank, `?` and all-`*` (the overflow marker) slots are absent. A decimal
/// comma is read as a decimal point.
pub fn decode(field: &DbfField, bytes: &[u8]) -> Result<FieldValue, DbfError> {
    let absent = if holds_integers(field) { FieldValue::Integer(None) } else { FieldValue::Numeric(None) };

    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');

    if text.is_empty() || text == "?" || text.chars().all(|c| c == '*') {
        return Ok(absent);
    }

    let text = text.replace(',', ".");
    if !NUMBER.is_match(&text) {
        return Err(DbfError::ParseError(format!("Field {}: {:?} is not a number", field.name, text)));
    }

    let parse_error = |err: &dyn std::fmt::Display| DbfError::ParseError(format!("Field {}: {:?} is not a number: {}", field.name, text, err));

    if holds_integers(field) {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(FieldValue::Integer(Some(i)));
        }
        // "12.0", or "1e3"
        let f = text.parse::<f64>().map_err(|err| parse_error(&err))?;
        if f.fract() != 0.0 || f.abs() >= 9.2e18 {
            return Err(DbfError::ParseError(format!("Field {}: {:?} is not an integer", field.name, text)));
        }
        Ok(FieldValue::Integer(Some(f as i64)))
    } else {
        text.parse::<f64>()
            .map(|f| FieldValue::Numeric(Some(f)))
            .map_err(|err| parse_error(&err))
    }
}

/// Right-aligns the number, padding with blanks. Floats are written with the
/// field's decimal count.
pub fn encode(field: &DbfField, value: &FieldValue, out: &mut Vec<u8>) -> Result<(), DbfError> {
    let text = match *value {
        FieldValue::Integer(Some(i)) if field.decimal_count == 0 => format!("{}", i),
        FieldValue::Integer(Some(i)) => format!("{:.*}", field.decimal_count, i as f64),
        FieldValue::Numeric(Some(f)) if f.is_finite() => format!("{:.*}", field.decimal_count, f),
        FieldValue::Numeric(Some(f)) => {
            return Err(DbfError::EncodeError(format!("Field {}: cannot store {}", field.name, f)));
        }
        _ => String::new(),
    };

    if text.len() > field.len {
        return Err(DbfError::Overflow { field: field.name.clone(), width: field.len, needed: text.len() });
    }

    out.resize(out.len() + field.len - text.len(), BLANK);
    out.extend_from_slice(text.as_bytes());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_integers() {
        let field = DbfField::numeric("POP", 10, 0);
        assert_eq!(FieldValue::Integer(Some(1234)), decode(&field, b"      1234").unwrap());
        assert_eq!(FieldValue::Integer(Some(-7)), decode(&field, b"-7        ").unwrap());
        assert_eq!(FieldValue::Integer(Some(12)), decode(&field, b"      12.0").unwrap());
        assert!(decode(&field, b"      12.5").is_err());
    }

    #[test]
    fn test_decode_floats() {
        let field = DbfField::numeric("AREA", 12, 3);
        assert_eq!(FieldValue::Numeric(Some(3.25)), decode(&field, b"       3.250").unwrap());
        assert_eq!(FieldValue::Numeric(Some(3.25)), decode(&field, b"       3,250").unwrap());
        assert_eq!(FieldValue::Numeric(Some(1500.0)), decode(&DbfField::float("F", 10, 2), b"   1.5E+03").unwrap());
    }

    #[test]
    fn test_decode_absent() {
        let field = DbfField::numeric("AREA", 6, 2);
        for bytes in [ &b"      "[..], b"     ?", b"******", b"\0\0\0\0\0\0" ].iter() {
            assert_eq!(FieldValue::Numeric(None), decode(&field, bytes).unwrap(), "{:?}", bytes);
        }
        assert_eq!(FieldValue::Integer(None), decode(&DbfField::numeric("N", 3, 0), b"   ").unwrap());
    }

    #[test]
    fn test_decode_garbage() {
        let field = DbfField::numeric("POP", 6, 0);
        match decode(&field, b"  12ab") {
            Err(DbfError::ParseError(ref message)) => assert!(message.contains("POP")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_encode() {
        let mut out = Vec::new();
        encode(&DbfField::numeric("POP", 6, 0), &FieldValue::Integer(Some(-42)), &mut out).unwrap();
        encode(&DbfField::numeric("AREA", 8, 2), &FieldValue::Numeric(Some(3.14159)), &mut out).unwrap();
        encode(&DbfField::numeric("AREA", 4, 2), &FieldValue::Numeric(None), &mut out).unwrap();
        assert_eq!(b"   -42    3.14    ".to_vec(), out);
    }

    #[test]
    fn test_encode_overflow() {
        let mut out = Vec::new();
        match encode(&DbfField::numeric("POP", 3, 0), &FieldValue::Integer(Some(1000)), &mut out) {
            Err(DbfError::Overflow { width: 3, needed: 4, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(out.is_empty());
    }
}
