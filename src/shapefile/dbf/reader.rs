use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use encoding::EncodingRef;

use super::{read_dbf_meta, DbfError, DbfField, DbfMeta, FieldValue, DBF_DELETED_FLAG};

/// One decoded row.
#[derive(Debug, Clone)]
pub struct DbfRecord {
    meta: Arc<DbfMeta>,
    /// 1-based, like ".shp" record numbers.
    pub row_number: usize,
    pub deleted: bool,
    pub values: Vec<FieldValue>,
}

impl DbfRecord {
    pub fn fields(&self) -> &[DbfField] {
        &self.meta.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.meta.field_index(name).map(|i| &self.values[i])
    }
}

/// Reads an xBase ".dbf" file, following instructions at
/// https://www.clicketyclick.dk/databases/xbase/format/dbf.html
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use shpio::shapefile::dbf::{DbfField, DbfReader, DbfWriter, FieldValue};
///
/// let fields = vec![ DbfField::character("NAME", 10) ];
/// let mut writer = DbfWriter::new(Cursor::new(vec![]), fields, encoding::all::UTF_8).unwrap();
/// writer.write_record(&[ FieldValue::Character(Some("bar".to_string())) ]).unwrap();
/// let buf = writer.finish().unwrap().into_inner();
///
/// let mut reader = DbfReader::new(Cursor::new(buf), None).unwrap();
/// assert_eq!(1, reader.record_count());
///
/// // read_record() returns Result<Option<DbfRecord>, DbfError>
/// let record = reader.read_record().unwrap().unwrap();
/// assert_eq!(Some(&FieldValue::Character(Some("bar".to_string()))), record.get("NAME"));
/// assert!(reader.read_record().unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct DbfReader<R: Read> {
    file: R,
    n_records_already_read: usize,
    meta: Arc<DbfMeta>,
    buf: Vec<u8>,
}

impl<R: Read> DbfReader<R> {
    /// Reads the header. With `encoding == None`, text is decoded per the
    /// header's language driver id, or as UTF-8.
    pub fn new(mut file: R, encoding: Option<EncodingRef>) -> Result<DbfReader<R>, DbfError> {
        let meta = read_dbf_meta(&mut file, encoding)?;
        Ok(DbfReader {
            file: file,
            n_records_already_read: 0,
            buf: vec![ 0u8; meta.n_bytes_per_record ],
            meta: Arc::new(meta),
        })
    }

    pub fn meta(&self) -> &DbfMeta {
        &self.meta
    }

    pub fn fields(&self) -> &[DbfField] {
        &self.meta.fields
    }

    pub fn get_field(&self, name: &str) -> Option<&DbfField> {
        self.meta.get_field(name)
    }

    pub fn record_count(&self) -> usize {
        self.meta.n_records
    }

    pub fn encoding(&self) -> EncodingRef {
        self.meta.encoding
    }

    pub fn rows_read(&self) -> usize {
        self.n_records_already_read
    }

    /// Loads the next row's bytes into `self.buf`. Returns false after the
    /// last row the header promises.
    fn read_row(&mut self) -> Result<bool, DbfError> {
        if self.n_records_already_read >= self.meta.n_records {
            return Ok(false);
        }

        if let Err(err) = self.file.read_exact(&mut self.buf) {
            return Err(match err.kind() {
                io::ErrorKind::UnexpectedEof => DbfError::ParseError(format!("File ends after {} rows, but its header says it has {}", self.n_records_already_read, self.meta.n_records)),
                _ => DbfError::IOError(err),
            });
        }

        self.n_records_already_read += 1;
        Ok(true)
    }

    pub fn read_record(&mut self) -> Result<Option<DbfRecord>, DbfError> {
        if !self.read_row()? {
            return Ok(None);
        }

        let row_number = self.n_records_already_read;
        let mut values = Vec::with_capacity(self.meta.fields.len());
        for field in self.meta.fields.iter() {
            let value = field.decode(&self.buf, self.meta.encoding)
                .map_err(|err| DbfError::ParseError(format!("Row {}: {}", row_number, err)))?;
            values.push(value);
        }

        Ok(Some(DbfRecord {
            meta: self.meta.clone(),
            row_number: row_number,
            deleted: self.buf[0] == DBF_DELETED_FLAG,
            values: values,
        }))
    }

    /// Advances past a row without decoding it.
    pub fn skip_row(&mut self) -> Result<bool, DbfError> {
        self.read_row()
    }
}

impl<R: Read + Seek> DbfReader<R> {
    pub fn restart(&mut self) -> Result<(), DbfError> {
        self.file.seek(SeekFrom::Start(self.meta.n_header_bytes as u64))?;
        self.n_records_already_read = 0;
        Ok(())
    }
}

impl<R: Read> Iterator for DbfReader<R> {
    type Item = Result<DbfRecord, DbfError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(err) => {
                // one error, then stop
                self.n_records_already_read = self.meta.n_records;
                Some(Err(err))
            }
        }
    }
}

/// Opens an xBase ".dbf" file from the filesystem.
///
/// With `encoding == None`, text is decoded per the header's language driver
/// id, or as UTF-8.
pub fn open(path: &Path, encoding: Option<EncodingRef>) -> Result<DbfReader<io::BufReader<fs::File>>, DbfError> {
    let f = fs::File::open(path)?;
    DbfReader::new(io::BufReader::new(f), encoding)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;
    use chrono::NaiveDate;
    use encoding::all::{UTF_8, WINDOWS_1252};
    use crate::shapefile::dbf::{DbfWriter, Logical};

    fn fields() -> Vec<DbfField> {
        vec![
            DbfField::character("NAME", 10),
            DbfField::numeric("POP", 8, 0),
            DbfField::numeric("AREA", 10, 2),
            DbfField::date("FOUNDED"),
            DbfField::logical("CAPITAL"),
        ]
    }

    fn table(encoding: EncodingRef) -> Vec<u8> {
        let mut writer = DbfWriter::new(Cursor::new(vec![]), fields(), encoding).unwrap();
        writer.write_record(&[
            FieldValue::Character(Some("Montr\u{e9}al".to_string())),
            FieldValue::Integer(Some(1704694)),
            FieldValue::Numeric(Some(431.5)),
            FieldValue::Date(NaiveDate::from_ymd_opt(1642, 5, 17)),
            FieldValue::Logical(Logical::False),
        ]).unwrap();
        writer.write_record(&[
            FieldValue::Character(None),
            FieldValue::Integer(None),
            FieldValue::Numeric(None),
            FieldValue::Date(None),
            FieldValue::Logical(Logical::Absent),
        ]).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_records() {
        let mut reader = DbfReader::new(Cursor::new(table(WINDOWS_1252)), None).unwrap();
        assert_eq!("windows-1252", reader.encoding().name());
        assert_eq!(2, reader.record_count());

        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(1, record.row_number);
        assert!(!record.deleted);
        assert_eq!(Some(&FieldValue::Character(Some("Montr\u{e9}al".to_string()))), record.get("NAME"));
        assert_eq!(Some(&FieldValue::Integer(Some(1704694))), record.get("POP"));
        assert_eq!(Some(&FieldValue::Numeric(Some(431.5))), record.get("AREA"));
        assert_eq!(Some(&FieldValue::Date(NaiveDate::from_ymd_opt(1642, 5, 17))), record.get("FOUNDED"));
        assert_eq!(Some(&FieldValue::Logical(Logical::False)), record.get("CAPITAL"));
        assert_eq!(None, record.get("NOPE"));

        let record = reader.read_record().unwrap().unwrap();
        assert!(record.values.iter().all(|v| v.is_absent()));

        assert!(reader.read_record().unwrap().is_none());
        assert_eq!(2, reader.rows_read());
    }

    #[test]
    fn test_deleted_flag() {
        let mut buf = table(UTF_8);
        let n_header_bytes = 32 + 32 * 5 + 1;
        buf[n_header_bytes] = DBF_DELETED_FLAG;
        let records: Vec<DbfRecord> = DbfReader::new(Cursor::new(buf), None).unwrap().map(|r| r.unwrap()).collect();
        assert!(records[0].deleted);
        assert!(!records[1].deleted);
    }

    #[test]
    fn test_truncated_rows() {
        let mut buf = table(UTF_8);
        let len = buf.len();
        buf.truncate(len - 10);

        let results: Vec<Result<DbfRecord, DbfError>> = DbfReader::new(Cursor::new(buf), None).unwrap().collect();
        assert_eq!(2, results.len());
        match results[1] {
            Err(DbfError::ParseError(ref message)) => assert!(message.contains("ends after 1 rows"), "{}", message),
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_skip_and_restart() {
        let mut reader = DbfReader::new(Cursor::new(table(UTF_8)), None).unwrap();
        assert!(reader.skip_row().unwrap());
        assert_eq!(2, reader.read_record().unwrap().unwrap().row_number);
        assert!(!reader.skip_row().unwrap());

        reader.restart().unwrap();
        assert_eq!(1, reader.read_record().unwrap().unwrap().row_number);
    }

    #[test]
    fn test_bad_number_names_row_and_field() {
        let mut buf = table(UTF_8);
        let pop_offset = 32 + 32 * 5 + 1 + 1 + 10;
        buf[pop_offset..pop_offset + 8].copy_from_slice(b"12 34 56");
        let mut reader = DbfReader::new(Cursor::new(buf), None).unwrap();
        match reader.read_record() {
            Err(DbfError::ParseError(ref message)) => {
                assert!(message.contains("Row 1"), "{}", message);
                assert!(message.contains("POP"), "{}", message);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
