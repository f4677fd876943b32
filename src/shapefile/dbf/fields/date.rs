use chrono::NaiveDate;

use crate::shapefile::dbf::{DbfError, DbfField};

pub const BLANK: u8 = b' ';

const FORMAT: &str = "%Y%m%d";

/// Reads `YYYYMMDD`. Blank and all-zero slots are absent.
pub fn decode(field: &DbfField, bytes: &[u8]) -> Result<Option<NaiveDate>, DbfError> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');

    if text.is_empty() || text.chars().all(|c| c == '0') {
        return Ok(None);
    }

    if text.len() != 8 {
        return Err(DbfError::ParseError(format!("Field {}: {:?} is not a YYYYMMDD date", field.name, text)));
    }

    NaiveDate::parse_from_str(text, FORMAT)
        .map(Some)
        .map_err(|err| DbfError::ParseError(format!("Field {}: {:?} is not a valid date: {}", field.name, text, err)))
}

pub fn encode(field: &DbfField, value: Option<&NaiveDate>, out: &mut Vec<u8>) -> Result<(), DbfError> {
    match value {
        None => out.resize(out.len() + field.len, BLANK),
        Some(date) => {
            let text = date.format(FORMAT).to_string();
            if text.len() > field.len {
                return Err(DbfError::Overflow { field: field.name.clone(), width: field.len, needed: text.len() });
            }
            out.extend_from_slice(text.as_bytes());
            out.resize(out.len() + field.len - text.len(), BLANK);
        }
    }
    Ok(())
}
