use std::fmt;
use std::io::{Seek, SeekFrom, Write};
use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{Datelike, Utc};
use encoding::{EncoderTrap, EncodingRef};

use super::{language_driver_for_encoding, DbfError, DbfField, FieldType, FieldValue};
use super::{DBF_EOF_MARKER, DBF_FIELD_DESCRIPTOR_LENGTH, DBF_FIELD_TERMINATOR, DBF_HEADER_LENGTH, DBF_LIVE_FLAG, DBF_MAX_FIELD_NAME_LENGTH, DBF_VERSION};

/// Writes an xBase ".dbf" file.
///
/// The header is written up front with a record count of 0; `finish()`
/// patches it.
pub struct DbfWriter<W: Write + Seek> {
    file: W,
    fields: Box<[DbfField]>,
    encoding: EncodingRef,
    n_records: u32,
    n_bytes_per_record: usize,
    buf: Vec<u8>,
}

// encoding::EncodingRef does not implement std::fmt::Debug
impl<W: Write + Seek + fmt::Debug> fmt::Debug for DbfWriter<W> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("DbfWriter")
            .field("file", &self.file)
            .field("fields", &self.fields)
            .field("encoding", &self.encoding.name())
            .field("n_records", &self.n_records)
            .finish()
    }
}

fn check_field(field: &DbfField, encoding: EncodingRef) -> Result<Vec<u8>, DbfError> {
    let name = encoding.encode(&field.name, EncoderTrap::Strict)
        .map_err(|err| DbfError::EncodeError(format!("Field name {:?} is not valid {}: {}", field.name, encoding.name(), err)))?;

    if name.is_empty() || name.len() > DBF_MAX_FIELD_NAME_LENGTH || name.contains(&0) {
        return Err(DbfError::EncodeError(format!("Field name {:?} must be 1 to {} bytes long", field.name, DBF_MAX_FIELD_NAME_LENGTH)));
    }

    let expected_len = match field.field_type {
        FieldType::Logical => Some(1),
        FieldType::Date => Some(8),
        FieldType::Unsupported(u) => {
            return Err(DbfError::EncodeError(format!("Field {} has unsupported type {:?}", field.name, u as char)));
        }
        FieldType::Character | FieldType::Numeric | FieldType::Float => None,
    };

    match expected_len {
        Some(len) if field.len != len => {
            return Err(DbfError::EncodeError(format!("Field {} is {:?}, so it must be {} bytes wide, not {}", field.name, field.field_type, len, field.len)));
        }
        _ => {}
    }

    if field.len == 0 || field.len > 254 {
        return Err(DbfError::EncodeError(format!("Field {} must be 1 to 254 bytes wide, not {}", field.name, field.len)));
    }

    if field.decimal_count > 15 || (field.decimal_count > 0 && field.decimal_count + 2 > field.len) {
        return Err(DbfError::EncodeError(format!("Field {} cannot have {} decimals in {} bytes", field.name, field.decimal_count, field.len)));
    }

    Ok(name)
}

impl<W: Write + Seek> DbfWriter<W> {
    pub fn new(mut file: W, fields: Vec<DbfField>, encoding: EncodingRef) -> Result<DbfWriter<W>, DbfError> {
        let mut names = Vec::with_capacity(fields.len());
        let mut fields = fields;
        let mut offset = 1; // deletion flag
        for field in fields.iter_mut() {
            names.push(check_field(field, encoding)?);
            field.offset = offset;
            offset += field.len;
        }

        if offset > u16::max_value() as usize {
            return Err(DbfError::EncodeError(format!("Rows would be {} bytes long; the maximum is {}", offset, u16::max_value())));
        }

        let n_header_bytes = DBF_HEADER_LENGTH + DBF_FIELD_DESCRIPTOR_LENGTH * fields.len() + 1;
        if n_header_bytes > u16::max_value() as usize {
            return Err(DbfError::EncodeError(format!("{} fields are too many", fields.len())));
        }

        let today = Utc::now().naive_utc().date();
        file.write_u8(DBF_VERSION)?;
        file.write_u8((today.year() - 1900).max(0).min(255) as u8)?;
        file.write_u8(today.month() as u8)?;
        file.write_u8(today.day() as u8)?;
        file.write_u32::<LittleEndian>(0)?;
        file.write_u16::<LittleEndian>(n_header_bytes as u16)?;
        file.write_u16::<LittleEndian>(offset as u16)?;
        let mut reserved = [ 0u8; 20 ];
        reserved[17] = language_driver_for_encoding(encoding); // byte 29
        file.write_all(&reserved)?;

        for (field, name) in fields.iter().zip(names.iter()) {
            let mut descriptor = [ 0u8; DBF_FIELD_DESCRIPTOR_LENGTH ];
            descriptor[..name.len()].copy_from_slice(name);
            descriptor[11] = field.field_type.code();
            descriptor[16] = field.len as u8;
            descriptor[17] = field.decimal_count as u8;
            file.write_all(&descriptor)?;
        }
        file.write_u8(DBF_FIELD_TERMINATOR)?;

        Ok(DbfWriter {
            file: file,
            fields: fields.into_boxed_slice(),
            encoding: encoding,
            n_records: 0,
            n_bytes_per_record: offset,
            buf: Vec::with_capacity(offset),
        })
    }

    pub fn fields(&self) -> &[DbfField] {
        &self.fields
    }

    pub fn record_count(&self) -> usize {
        self.n_records as usize
    }

    /// Appends one live row. Nothing is written if any value fails to
    /// encode.
    pub fn write_record(&mut self, values: &[FieldValue]) -> Result<(), DbfError> {
        self.encode_row(values)?;
        self.write_encoded_row()
    }

    /// Encodes a row into the scratch buffer without writing it.
    pub(crate) fn encode_row(&mut self, values: &[FieldValue]) -> Result<(), DbfError> {
        if values.len() != self.fields.len() {
            return Err(DbfError::FieldCount { expected: self.fields.len(), found: values.len() });
        }

        self.buf.clear();
        self.buf.push(DBF_LIVE_FLAG);
        for (field, value) in self.fields.iter().zip(values.iter()) {
            if let Err(err) = field.encode(value, self.encoding, &mut self.buf) {
                self.buf.clear();
                return Err(err);
            }
        }
        debug_assert_eq!(self.n_bytes_per_record, self.buf.len());
        Ok(())
    }

    /// Writes the row `encode_row()` prepared.
    pub(crate) fn write_encoded_row(&mut self) -> Result<(), DbfError> {
        if self.buf.len() != self.n_bytes_per_record {
            return Err(DbfError::EncodeError(String::from("No row was encoded")));
        }
        if self.n_records == u32::max_value() {
            return Err(DbfError::EncodeError(String::from("Too many rows")));
        }

        self.file.write_all(&self.buf)?;
        self.buf.clear();
        self.n_records += 1;
        Ok(())
    }

    /// Writes the end-of-file marker, patches the record count and hands back
    /// the stream, positioned at its end.
    pub fn finish(mut self) -> Result<W, DbfError> {
        self.file.write_u8(DBF_EOF_MARKER)?;
        self.file.seek(SeekFrom::Start(4))?;
        self.file.write_u32::<LittleEndian>(self.n_records)?;
        self.file.seek(SeekFrom::End(0))?;
        self.file.flush()?;
        Ok(self.file)
    }
}
