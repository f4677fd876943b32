use std::fmt;
use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use encoding::EncodingRef;
use encoding::label::encoding_from_whatwg_label;
use thiserror::Error;

use crate::geo::Geometry;
use super::dbf::{DbfError, DbfField, DbfReader, DbfRecord, DbfWriter, FieldValue};
use super::options::ReaderOptions;
use super::shp::{RecordError, ShapeType, ShpError, ShpReader, ShpWriter};

#[derive(Debug, Error)]
pub enum ShapefileError {
    #[error("{0}")]
    ShpError(#[from] ShpError),

    #[error("{0}")]
    DbfError(#[from] DbfError),

    /// The ".shp" and ".dbf" files disagree about how many records there are.
    #[error("Join error: {0}")]
    JoinError(String),

    #[error("{0}")]
    IOError(#[from] io::Error),
}

/// A geometry and its attributes.
#[derive(Debug, Clone)]
pub struct ShapefileRecord {
    pub record_number: u32,
    pub geometry: Geometry,
    pub data: DbfRecord,
}

impl fmt::Display for ShapefileRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{} {}", self.record_number, self.geometry)?;
        for (field, value) in self.data.fields().iter().zip(self.data.values.iter()) {
            write!(f, "; {}: {}", field.name, value)?;
        }
        Ok(())
    }
}

/// Iterates over ".shp" and ".dbf" records simultaneously.
///
/// The ".dbf" row count caps the ".shp" reader, and the reader reports a
/// `JoinError` when either file has records the other lacks. When the ".shp"
/// reader skips a record (it is outside the spatial filter, or invalid) the
/// matching ".dbf" row is skipped too.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use shpio::geo::{Coord, Geometry};
/// use shpio::shapefile::{ReaderOptions, ShapefileReader, ShapefileWriter};
/// use shpio::shapefile::dbf::{DbfField, FieldValue};
/// use shpio::shapefile::shp::ShapeType;
///
/// let mut writer = ShapefileWriter::new(
///     Cursor::new(vec![]),
///     Cursor::new(vec![]),
///     Cursor::new(vec![]),
///     ShapeType::Point,
///     vec![ DbfField::character("foo", 10) ],
///     encoding::all::UTF_8,
/// ).unwrap();
/// writer.write(&Geometry::Point(Some(Coord::xy(295.0, -249.0))), &[ FieldValue::Character(Some("bar".to_string())) ]).unwrap();
/// let (shp, _shx, dbf) = writer.finish().unwrap();
///
/// // builder returns Result<ShapefileReader, ShapefileError>
/// let shp = Cursor::new(shp.into_inner());
/// let dbf = Cursor::new(dbf.into_inner());
/// let mut reader = ShapefileReader::new(shp, dbf, ReaderOptions::default()).unwrap();
///
/// // read_next() returns Result<Option<ShapefileRecord>, ShapefileError>
/// let record = reader.read_next().unwrap().unwrap();
/// assert_eq!(Geometry::Point(Some(Coord::xy(295.0, -249.0))), record.geometry);
/// assert_eq!(Some(&FieldValue::Character(Some("bar".to_string()))), record.data.get("foo"));
///
/// assert!(reader.read_next().unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct ShapefileReader<R: Read, S: Read> {
    shp_reader: ShpReader<R>,
    dbf_reader: DbfReader<S>,
    projection: Option<String>,
    ceiling: usize,
    done: bool,
}

impl<R: Read, S: Read> ShapefileReader<R, S> {
    pub fn new(shp: R, dbf: S, options: ReaderOptions) -> Result<ShapefileReader<R, S>, ShapefileError> {
        let dbf_reader = DbfReader::new(dbf, options.encoding)?;

        let n_rows = dbf_reader.record_count();
        let ceiling = options.attribute_row_count_ceiling.map_or(n_rows, |n| n.min(n_rows));
        let shp_reader = ShpReader::new(shp, options.with_attribute_row_count_ceiling(ceiling))?;

        Ok(ShapefileReader {
            shp_reader: shp_reader,
            dbf_reader: dbf_reader,
            projection: None,
            ceiling: ceiling,
            done: false,
        })
    }

    pub fn with_projection(mut self, projection: Option<String>) -> ShapefileReader<R, S> {
        self.projection = projection;
        self
    }

    /// Contents of the ".prj" file, if there was one.
    pub fn projection(&self) -> Option<&str> {
        self.projection.as_ref().map(|s| &s[..])
    }

    pub fn shape_type(&self) -> ShapeType {
        self.shp_reader.header().shape_type
    }

    pub fn dbf_fields(&self) -> &[DbfField] {
        self.dbf_reader.fields()
    }

    pub fn get_field(&self, name: &str) -> Option<&DbfField> {
        self.dbf_reader.get_field(name)
    }

    pub fn shp_reader(&self) -> &ShpReader<R> {
        &self.shp_reader
    }

    pub fn dbf_reader(&self) -> &DbfReader<S> {
        &self.dbf_reader
    }

    /// Records the ".shp" reader stepped over, oldest first.
    pub fn errors(&self) -> &[RecordError] {
        self.shp_reader.errors()
    }

    /// Reads the next geometry and its attributes, or None at the end of
    /// both files.
    pub fn read_next(&mut self) -> Result<Option<ShapefileRecord>, ShapefileError> {
        if !self.shp_reader.read_next()? {
            let n_rows = self.dbf_reader.record_count();
            let n_records = self.shp_reader.records_consumed();
            if n_records < self.ceiling {
                return Err(ShapefileError::JoinError(format!("'.dbf' file has {} rows, but the '.shp' file has only {} records", n_rows, n_records)));
            }
            if self.ceiling == n_rows && self.shp_reader.has_remaining_data() {
                return Err(ShapefileError::JoinError(format!("'.shp' file has more records than the '.dbf' file's {} rows", n_rows)));
            }
            return Ok(None);
        }

        let record_number = self.shp_reader.current_record_number();

        // rows for records the .shp reader skipped
        while self.dbf_reader.rows_read() + 1 < record_number as usize {
            if !self.dbf_reader.skip_row()? {
                break;
            }
        }

        let data = match self.dbf_reader.read_record()? {
            Some(data) => data,
            None => {
                return Err(ShapefileError::JoinError(format!("'.dbf' file has no row for record number {}", record_number)));
            }
        };

        match self.shp_reader.take_geometry() {
            Some(geometry) => Ok(Some(ShapefileRecord { record_number: record_number, geometry: geometry, data: data })),
            None => Err(ShapefileError::JoinError(format!("Record number {} has no geometry", record_number))),
        }
    }
}

impl<R: Read + Seek, S: Read + Seek> ShapefileReader<R, S> {
    /// Rewinds both files to their first records.
    pub fn restart(&mut self) -> Result<(), ShapefileError> {
        self.shp_reader.restart()?;
        self.dbf_reader.restart()?;
        self.done = false;
        Ok(())
    }
}

impl<R: Read, S: Read> Iterator for ShapefileReader<R, S> {
    type Item = Result<ShapefileRecord, ShapefileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Finds the file next to `shp_path` with extension `ext`, in lower or upper
/// case.
fn sibling(shp_path: &Path, ext: &str) -> Option<PathBuf> {
    for candidate in [ ext.to_lowercase(), ext.to_uppercase() ].iter() {
        let path = shp_path.with_extension(candidate);
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

/// The encoding a ".cpg" file names. Accepts WHATWG labels ("UTF-8",
/// "windows-1252") and bare Windows code page numbers ("1252").
pub fn encoding_from_cpg(text: &str) -> Option<EncodingRef> {
    let label = text.trim().to_lowercase();
    if let Some(encoding) = encoding_from_whatwg_label(&label) {
        return Some(encoding);
    }

    match label.parse::<u32>() {
        Ok(65001) => encoding_from_whatwg_label("utf-8"),
        Ok(936) => encoding_from_whatwg_label("gbk"),
        Ok(932) => encoding_from_whatwg_label("shift_jis"),
        Ok(949) => encoding_from_whatwg_label("euc-kr"),
        Ok(950) => encoding_from_whatwg_label("big5"),
        Ok(n) => encoding_from_whatwg_label(&format!("windows-{}", n)),
        Err(_) => None,
    }
}

/// Open by ".shp" filename.
///
/// This will automatically search for the accompanying ".dbf"; it will fail
/// if that file does not exist. A ".cpg" file, if present, sets the ".dbf"
/// encoding (unless `options.encoding` is set). A ".prj" file, if present, is
/// read as text.
pub fn open(shp_path: &Path, options: ReaderOptions) -> Result<ShapefileReader<io::BufReader<fs::File>, io::BufReader<fs::File>>, ShapefileError> {
    let shp_f = io::BufReader::new(fs::File::open(shp_path)?);

    let dbf_path = match sibling(shp_path, "dbf") {
        Some(path) => path,
        None => {
            return Err(ShapefileError::IOError(io::Error::new(io::ErrorKind::NotFound, format!("No '.dbf' file next to {}", shp_path.display()))));
        }
    };
    let dbf_f = io::BufReader::new(fs::File::open(&dbf_path)?);

    let mut options = options;
    if options.encoding.is_none() {
        if let Some(cpg_path) = sibling(shp_path, "cpg") {
            let text = fs::read_to_string(&cpg_path)?;
            match encoding_from_cpg(&text) {
                Some(encoding) => {
                    debug!("{} means encoding {}", cpg_path.display(), encoding.name());
                    options.encoding = Some(encoding);
                }
                None => warn!("Ignoring {}: unknown encoding {:?}", cpg_path.display(), text.trim()),
            }
        }
    }

    let projection = match sibling(shp_path, "prj") {
        Some(prj_path) => Some(fs::read_to_string(&prj_path)?),
        None => None,
    };

    Ok(ShapefileReader::new(shp_f, dbf_f, options)?.with_projection(projection))
}

/// Writes ".shp", ".shx" and ".dbf" files in lockstep.
#[derive(Debug)]
pub struct ShapefileWriter<W: Write + Seek, X: Write + Seek, D: Write + Seek> {
    shp_writer: ShpWriter<W, X>,
    dbf_writer: DbfWriter<D>,
}

impl<W: Write + Seek, X: Write + Seek, D: Write + Seek> ShapefileWriter<W, X, D> {
    pub fn new(shp: W, shx: X, dbf: D, shape_type: ShapeType, fields: Vec<DbfField>, encoding: EncodingRef) -> Result<ShapefileWriter<W, X, D>, ShapefileError> {
        Ok(ShapefileWriter {
            shp_writer: ShpWriter::new(shp, shx, shape_type)?,
            dbf_writer: DbfWriter::new(dbf, fields, encoding)?,
        })
    }

    pub fn record_count(&self) -> usize {
        self.shp_writer.record_count()
    }

    /// Appends a geometry and its attributes. If either can't be encoded,
    /// neither is written.
    pub fn write(&mut self, geometry: &Geometry, values: &[FieldValue]) -> Result<(), ShapefileError> {
        self.dbf_writer.encode_row(values)?;
        self.shp_writer.write(geometry)?;
        self.dbf_writer.write_encoded_row()?;
        Ok(())
    }

    pub fn finish(self) -> Result<(W, X, D), ShapefileError> {
        let (shp, shx) = self.shp_writer.finish()?;
        let dbf = self.dbf_writer.finish()?;
        Ok((shp, shx, dbf))
    }
}

/// Creates `<path>.shp`, `.shx`, `.dbf` and `.cpg`, plus `.prj` when
/// `projection` is given.
pub fn create(path: &Path, shape_type: ShapeType, fields: Vec<DbfField>, encoding: EncodingRef, projection: Option<&str>) -> Result<ShapefileWriter<io::BufWriter<fs::File>, io::BufWriter<fs::File>, io::BufWriter<fs::File>>, ShapefileError> {
    let create = |ext: &str| -> io::Result<io::BufWriter<fs::File>> {
        Ok(io::BufWriter::new(fs::File::create(path.with_extension(ext))?))
    };

    let writer = ShapefileWriter::new(create("shp")?, create("shx")?, create("dbf")?, shape_type, fields, encoding)?;

    fs::write(path.with_extension("cpg"), encoding.whatwg_name().unwrap_or_else(|| encoding.name()).to_uppercase())?;
    if let Some(projection) = projection {
        fs::write(path.with_extension("prj"), projection)?;
    }

    Ok(writer)
}
