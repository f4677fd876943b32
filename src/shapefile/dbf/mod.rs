//! Reads and writes xBase ".dbf" files, as per
//! https://www.clicketyclick.dk/databases/xbase/format/dbf.html
use std::fmt;
use std::io;
use byteorder::{ByteOrder, LittleEndian};
use chrono::NaiveDate;
use encoding::EncodingRef;
use encoding::all::{BIG5_2003, GBK, UTF_8, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252, WINDOWS_31J, WINDOWS_949};
use thiserror::Error;

use super::layout::decode_fixed_string;

mod fields;
mod reader;
mod value;
mod writer;

pub use self::reader::{open, DbfReader, DbfRecord};
pub use self::value::{FieldValue, Logical};
pub use self::writer::DbfWriter;

pub const DBF_HEADER_LENGTH: usize = 32;
pub const DBF_FIELD_DESCRIPTOR_LENGTH: usize = 32;
pub const DBF_VERSION: u8 = 0x03;
pub const DBF_FIELD_TERMINATOR: u8 = 0x0d;
pub const DBF_EOF_MARKER: u8 = 0x1a;
pub const DBF_DELETED_FLAG: u8 = b'*';
pub const DBF_LIVE_FLAG: u8 = b' ';
pub const DBF_MAX_FIELD_NAME_LENGTH: usize = 10;

#[derive(Debug, Error)]
pub enum DbfError {
    #[error("{0}")]
    IOError(#[from] io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Field {field}: value needs {needed} bytes, but the field is {width} bytes wide")]
    Overflow { field: String, width: usize, needed: usize },

    #[error("Field {field} is {field_type:?}; cannot store {value:?}")]
    TypeMismatch { field: String, field_type: FieldType, value: FieldValue },

    #[error("Row has {found} values, but the table has {expected} fields")]
    FieldCount { expected: usize, found: usize },

    #[error("Cannot encode: {0}")]
    EncodeError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Character,
    Numeric,
    Float,
    Date,
    Logical,
    /// Memo, binary, etc. Read as Character text.
    Unsupported(u8),
}

impl FieldType {
    pub fn with_u8(u: u8) -> FieldType {
        match u {
            b'C' => FieldType::Character,
            b'N' => FieldType::Numeric,
            b'F' => FieldType::Float,
            b'D' => FieldType::Date,
            b'L' => FieldType::Logical,
            _ => FieldType::Unsupported(u),
        }
    }

    pub fn code(&self) -> u8 {
        match *self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
            FieldType::Date => b'D',
            FieldType::Logical => b'L',
            FieldType::Unsupported(u) => u,
        }
    }
}

/// A column of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct DbfField {
    pub name: String,
    pub field_type: FieldType,
    /// Position within a row. Byte 0 of every row is the deletion flag, so
    /// the first field is at offset 1.
    pub offset: usize,
    pub len: usize,
    pub decimal_count: usize,
}

impl DbfField {
    pub fn new(name: &str, field_type: FieldType, len: usize, decimal_count: usize) -> DbfField {
        DbfField {
            name: name.to_string(),
            field_type: field_type,
            offset: 0,
            len: len,
            decimal_count: decimal_count,
        }
    }

    pub fn character(name: &str, len: usize) -> DbfField {
        DbfField::new(name, FieldType::Character, len, 0)
    }

    /// A Numeric field. With `decimal_count == 0` it holds integers.
    pub fn numeric(name: &str, len: usize, decimal_count: usize) -> DbfField {
        DbfField::new(name, FieldType::Numeric, len, decimal_count)
    }

    pub fn float(name: &str, len: usize, decimal_count: usize) -> DbfField {
        DbfField::new(name, FieldType::Float, len, decimal_count)
    }

    pub fn date(name: &str) -> DbfField {
        DbfField::new(name, FieldType::Date, 8, 0)
    }

    pub fn logical(name: &str) -> DbfField {
        DbfField::new(name, FieldType::Logical, 1, 0)
    }

    /// Decodes this field's slot of a row.
    pub fn decode(&self, row: &[u8], encoding: EncodingRef) -> Result<FieldValue, DbfError> {
        let bytes = &row[self.offset .. self.offset + self.len];
        match self.field_type {
            FieldType::Character | FieldType::Unsupported(_) => Ok(FieldValue::Character(fields::character::decode(bytes, encoding))),
            FieldType::Numeric | FieldType::Float => fields::numeric::decode(self, bytes),
            FieldType::Date => fields::date::decode(self, bytes).map(FieldValue::Date),
            FieldType::Logical => Ok(FieldValue::Logical(fields::logical::decode(bytes))),
        }
    }

    /// Appends this field's slot of a row.
    pub fn encode(&self, value: &FieldValue, encoding: EncodingRef, out: &mut Vec<u8>) -> Result<(), DbfError> {
        match (self.field_type, value) {
            (FieldType::Character, &FieldValue::Character(ref s)) => fields::character::encode(self, s.as_ref().map(|s| &s[..]), encoding, out),
            (FieldType::Numeric, &FieldValue::Integer(_))
                | (FieldType::Numeric, &FieldValue::Numeric(_))
                | (FieldType::Float, &FieldValue::Integer(_))
                | (FieldType::Float, &FieldValue::Numeric(_)) => fields::numeric::encode(self, value, out),
            (FieldType::Date, &FieldValue::Date(ref d)) => fields::date::encode(self, d.as_ref(), out),
            (FieldType::Logical, &FieldValue::Logical(l)) => {
                fields::logical::encode(l, out);
                Ok(())
            }
            _ => Err(DbfError::TypeMismatch { field: self.name.clone(), field_type: self.field_type, value: value.clone() }),
        }
    }
}

/// Everything the header says about the table.
pub struct DbfMeta {
    pub n_records: usize,
    pub n_header_bytes: usize,
    pub n_bytes_per_record: usize,
    pub last_update: Option<NaiveDate>,
    pub language_driver_id: u8,
    pub fields: Box<[DbfField]>,
    pub encoding: EncodingRef,
}

// encoding::EncodingRef does not implement std::fmt::Debug
impl fmt::Debug for DbfMeta {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("DbfMeta")
            .field("n_records", &self.n_records)
            .field("n_header_bytes", &self.n_header_bytes)
            .field("n_bytes_per_record", &self.n_bytes_per_record)
            .field("last_update", &self.last_update)
            .field("language_driver_id", &self.language_driver_id)
            .field("fields", &self.fields)
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

impl DbfMeta {
    pub fn get_field(&self, name: &str) -> Option<&DbfField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// The text encoding a ".dbf" language driver id stands for, for the ids we
/// know.
pub fn encoding_for_language_driver(id: u8) -> Option<EncodingRef> {
    match id {
        0x01 | 0x02 | 0x03 | 0x57 => Some(WINDOWS_1252),
        0xc8 => Some(WINDOWS_1250),
        0xc9 => Some(WINDOWS_1251),
        0x4d | 0x7a => Some(GBK),
        0x4e => Some(WINDOWS_949),
        0x4f => Some(BIG5_2003),
        0x13 | 0x7b => Some(WINDOWS_31J),
        _ => None,
    }
}

/// The language driver id we write for `encoding`; 0 (unspecified) when
/// there isn't one, UTF-8 included.
pub fn language_driver_for_encoding(encoding: EncodingRef) -> u8 {
    match encoding.name() {
        "windows-1252" => 0x57,
        "windows-1250" => 0xc8,
        "windows-1251" => 0xc9,
        "gbk" => 0x4d,
        "windows-949" => 0x4e,
        "big5-2003" => 0x4f,
        "windows-31j" => 0x13,
        _ => 0,
    }
}

/// What we know after reading the fixed 32-byte header.
#[derive(Debug)]
struct DbfHeader {
    n_records: usize,
    n_header_bytes: usize,
    n_bytes_per_record: usize,
    last_update: Option<NaiveDate>,
    language_driver_id: u8,
}

/// Reads the first 32 bytes of the file.
///
/// Side-effect: advances the file cursor 32 bytes.
fn read_dbf_header(file: &mut dyn io::Read) -> Result<DbfHeader, DbfError> {
    let mut buf = [ 0u8; DBF_HEADER_LENGTH ];
    file.read_exact(&mut buf)?;

    // It's hard to come up with a ParseError, because virtually any
    // combination of 32 bytes is a valid .dbf header.
    //
    // The one exception: invalid dates. bytes 1-3 (base 0) are "YMD"
    // in hex. All years are valid; there are 12 valid months and 31
    // valid days.
    if buf[2] > 12 || buf[3] > 31 {
        return Err(DbfError::ParseError(String::from("The first four bytes of the file mention an invalid creation date. This is not a valid .dbf file.")));
    }

    let header = DbfHeader {
        n_records: LittleEndian::read_u32(&buf[4..8]) as usize,
        n_header_bytes: LittleEndian::read_u16(&buf[8..10]) as usize,
        n_bytes_per_record: LittleEndian::read_u16(&buf[10..12]) as usize,
        last_update: NaiveDate::from_ymd_opt(1900 + buf[1] as i32, buf[2] as u32, buf[3] as u32),
        language_driver_id: buf[29],
    };

    if header.n_header_bytes < DBF_HEADER_LENGTH + 1 {
        return Err(DbfError::ParseError(format!("Header says it is {} bytes long, but it needs at least {}", header.n_header_bytes, DBF_HEADER_LENGTH + 1)));
    }

    if header.n_bytes_per_record < 1 {
        return Err(DbfError::ParseError(String::from("Header says rows are 0 bytes long")));
    }

    Ok(header)
}

/// Reads all field definitions from the file.
///
/// Assumes exactly DBF_HEADER_LENGTH bytes of the file have been read already.
/// In other words, call this after read_dbf_header().
///
/// Side-effect: advances the file cursor to the first data record.
fn read_dbf_fields(file: &mut dyn io::Read, dbf_header: &DbfHeader, encoding: EncodingRef) -> Result<Box<[DbfField]>, DbfError> {
    let mut buf = vec![ 0u8; dbf_header.n_header_bytes - DBF_HEADER_LENGTH ];
    file.read_exact(&mut buf)?;

    let mut fields = Vec::new();
    let mut offset = 1; // deletion flag

    for descriptor in buf.chunks(DBF_FIELD_DESCRIPTOR_LENGTH) {
        if descriptor[0] == DBF_FIELD_TERMINATOR || descriptor.len() < DBF_FIELD_DESCRIPTOR_LENGTH {
            break;
        }

        let name_end = descriptor[..11].iter().position(|&b| b == 0).unwrap_or(11);
        let field = DbfField {
            name: decode_fixed_string(&descriptor[..name_end], encoding),
            field_type: FieldType::with_u8(descriptor[11]),
            offset: offset,
            len: descriptor[16] as usize,
            decimal_count: descriptor[17] as usize,
        };
        offset += field.len;
        fields.push(field);
    }

    if offset > dbf_header.n_bytes_per_record {
        return Err(DbfError::ParseError(format!("Fields need {} bytes per row, but the header says rows are {} bytes long", offset, dbf_header.n_bytes_per_record)));
    }

    Ok(fields.into_boxed_slice())
}

/// Reads the header, including field definitions, from a .dbf file.
///
/// Text is decoded with `encoding` if given; otherwise with the encoding the
/// language driver id stands for; otherwise as UTF-8.
///
/// Assumes the cursor is at the start of the file.
///
/// Side-effect: advances the file cursor to the first data record.
fn read_dbf_meta(file: &mut dyn io::Read, encoding: Option<EncodingRef>) -> Result<DbfMeta, DbfError> {
    let dbf_header = read_dbf_header(file)?;

    let encoding = match encoding {
        Some(encoding) => encoding,
        None => match encoding_for_language_driver(dbf_header.language_driver_id) {
            Some(encoding) => {
                debug!("Language driver 0x{:02x} means encoding {}", dbf_header.language_driver_id, encoding.name());
                encoding
            }
            None => UTF_8,
        },
    };

    let dbf_fields = read_dbf_fields(file, &dbf_header, encoding)?;
    debug!("Opened .dbf file: {} rows of {} fields", dbf_header.n_records, dbf_fields.len());

    Ok(DbfMeta {
        n_records: dbf_header.n_records,
        n_header_bytes: dbf_header.n_header_bytes,
        n_bytes_per_record: dbf_header.n_bytes_per_record,
        last_update: dbf_header.last_update,
        language_driver_id: dbf_header.language_driver_id,
        fields: dbf_fields,
        encoding: encoding,
    })
}
