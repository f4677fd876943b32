use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use byteorder::{ByteOrder, LittleEndian};

use crate::geo::{Envelope, Geometry};
use crate::shapefile::layout::{read_record_header, read_shp_header, SHP_HEADER_LENGTH, SHP_RECORD_HEADER_LENGTH};
use crate::shapefile::options::{GeometryBuilderMode, ReaderOptions, SpatialFilterMode};
use super::shapes::DecodeContext;
use super::{RecordError, ShpError, ShpHeader};

/// One geometry, as yielded by `ShpReader`'s `Iterator` impl.
#[derive(Debug, Clone, PartialEq)]
pub struct ShpRecord {
    pub record_number: u32,
    pub geometry: Geometry,
}

/// Reads an ESRI ".shp" Shapefile, following instructions at
/// https://www.esri.com/library/whitepapers/pdfs/shapefile.pdf
///
/// Records whose shape type differs from the file's are skipped and logged in
/// `errors()`. So are invalid geometries, when the reader is configured with
/// `GeometryBuilderMode::SkipInvalidShapes`. Records outside the spatial
/// filter are skipped silently and counted in `filtered_count()`.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use shpio::geo::{Coord, Geometry};
/// use shpio::shapefile::ReaderOptions;
/// use shpio::shapefile::shp::{ShapeType, ShpReader, ShpWriter};
///
/// let mut writer = ShpWriter::new(Cursor::new(vec![]), Cursor::new(vec![]), ShapeType::Point).unwrap();
/// writer.write(&Geometry::Point(Some(Coord::xy(1.0, 2.0)))).unwrap();
/// let (shp, _shx) = writer.finish().unwrap();
///
/// let mut reader = ShpReader::new(Cursor::new(shp.into_inner()), ReaderOptions::default()).unwrap();
///
/// // read_next() returns Result<bool, ShpError>
/// assert!(reader.read_next().unwrap());
/// assert_eq!(1, reader.current_record_number());
/// assert_eq!(Some(&Geometry::Point(Some(Coord::xy(1.0, 2.0)))), reader.geometry());
///
/// assert!(!reader.read_next().unwrap());
/// ```
#[derive(Debug)]
pub struct ShpReader<R: Read> {
    file: R,
    header: ShpHeader,
    options: ReaderOptions,
    filter_geometry: Option<Geometry>,
    n_bytes_already_read: usize,
    next_record_number: u32,
    current_record_number: u32,
    buf: Vec<u8>,
    geometry: Option<Geometry>,
    errors: Vec<RecordError>,
    n_skipped: usize,
    n_filtered: usize,
    failed: bool,
}

impl<R: Read> ShpReader<R> {
    pub fn new(mut file: R, options: ReaderOptions) -> Result<ShpReader<R>, ShpError> {
        let header = read_shp_header(&mut file)?;
        debug!("Opened {:?} file: {} bytes, bounding box {:?}", header.shape_type, header.file_n_bytes, header.bounding_box);

        let filter_geometry = match options.spatial_filter_mode {
            SpatialFilterMode::FilterByGeometry => options.spatial_filter_envelope.map(|e| e.to_geometry()),
            SpatialFilterMode::FilterByExtent => None,
        };

        Ok(ShpReader {
            file: file,
            header: header,
            options: options,
            filter_geometry: filter_geometry,
            n_bytes_already_read: SHP_HEADER_LENGTH,
            next_record_number: 1,
            current_record_number: 0,
            buf: Vec::new(),
            geometry: None,
            errors: Vec::new(),
            n_skipped: 0,
            n_filtered: 0,
            failed: false,
        })
    }

    pub fn header(&self) -> &ShpHeader {
        &self.header
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// The geometry loaded by the last successful `read_next()`.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Moves the loaded geometry out of the reader.
    pub fn take_geometry(&mut self) -> Option<Geometry> {
        self.geometry.take()
    }

    /// Record number of `geometry()`; 0 before the first read.
    pub fn current_record_number(&self) -> u32 {
        self.current_record_number
    }

    /// How many records were read from the stream, skipped ones included.
    pub fn records_consumed(&self) -> usize {
        (self.next_record_number - 1) as usize
    }

    pub fn skipped_count(&self) -> usize {
        self.n_skipped
    }

    pub fn filtered_count(&self) -> usize {
        self.n_filtered
    }

    /// Every record the reader stepped over, oldest first.
    pub fn errors(&self) -> &[RecordError] {
        &self.errors
    }

    /// True iff the header promises records we haven't read.
    pub fn has_remaining_data(&self) -> bool {
        self.n_bytes_already_read < self.header.file_n_bytes
    }

    /// True iff a record with bounding box `envelope` may pass the spatial
    /// filter. Always true when there is no filter.
    pub fn is_in_filter_envelope(&self, envelope: &Envelope) -> bool {
        match self.options.spatial_filter_envelope {
            None => true,
            Some(ref filter) => filter.intersects(envelope),
        }
    }

    /// True iff `geometry` passes the spatial filter. Always true when there
    /// is no filter.
    pub fn is_in_filter(&self, geometry: &Geometry) -> bool {
        match (&self.options.spatial_filter_envelope, &self.filter_geometry) {
            (None, _) => true,
            (Some(_), Some(filter)) => filter.intersects(geometry),
            (Some(_), None) => self.is_in_filter_envelope(&geometry.envelope()),
        }
    }

    /// Loads the next geometry, making it available through `geometry()`.
    ///
    /// Returns Ok(false) once the file (or the attribute row count ceiling)
    /// is exhausted. After an Err, every call returns
    /// `Err(ShpError::ReaderFailed)` until `restart()`.
    pub fn read_next(&mut self) -> Result<bool, ShpError> {
        if self.failed {
            return Err(ShpError::ReaderFailed);
        }

        let result = self.read_core();
        if result.is_err() {
            self.failed = true;
            self.geometry = None;
        }
        result
    }

    fn read_core(&mut self) -> Result<bool, ShpError> {
        loop {
            if !self.has_remaining_data() {
                return self.check_stream_ends();
            }
            if let Some(ceiling) = self.options.attribute_row_count_ceiling {
                if self.next_record_number as usize > ceiling {
                    return Ok(false);
                }
            }

            let remaining = self.header.file_n_bytes - self.n_bytes_already_read;
            if remaining < SHP_RECORD_HEADER_LENGTH {
                return Err(ShpError::Corrupt(format!("File header says there are {} more bytes, too few for a record header", remaining)));
            }

            let (record_number, content_n_bytes) = read_record_header(&mut self.file).map_err(|err| self.truncated(err))?;

            if record_number != self.next_record_number {
                return Err(ShpError::OutOfSequence { expected: self.next_record_number, found: record_number });
            }

            if content_n_bytes < 4 {
                return Err(ShpError::Corrupt(format!("Record number {} is {} bytes long, too short for a shape type", record_number, content_n_bytes)));
            }

            if content_n_bytes > remaining - SHP_RECORD_HEADER_LENGTH {
                return Err(ShpError::Corrupt(format!("Record number {} is {} bytes long, but the file header says only {} bytes remain", record_number, content_n_bytes, remaining - SHP_RECORD_HEADER_LENGTH)));
            }

            self.buf.resize(content_n_bytes, 0);
            if let Err(err) = self.file.read_exact(&mut self.buf[..]) {
                return Err(self.truncated(err));
            }
            self.n_bytes_already_read += SHP_RECORD_HEADER_LENGTH + content_n_bytes;
            self.next_record_number += 1;

            let tag = LittleEndian::read_u32(&self.buf[0..4]);

            if tag == 0 {
                self.geometry = Some(self.empty_geometry());
                self.current_record_number = record_number;
                return Ok(true);
            }

            let shape_type = self.header.shape_type;
            let kind = match shape_type.kind() {
                Some(kind) if tag == shape_type.code() => kind,
                _ => {
                    self.skip(RecordError::TypeMismatch { record_number: record_number, expected: shape_type, found: tag });
                    continue;
                }
            };

            if let Some(bounds) = kind.record_bounds(&self.buf[4..]) {
                if !self.is_in_filter_envelope(&bounds) {
                    trace!("Record number {} is outside the spatial filter", record_number);
                    self.n_filtered += 1;
                    continue;
                }
            }

            let decoded = {
                let ctx = DecodeContext {
                    shape_type: shape_type,
                    factory: &self.options.geometry_factory,
                    mode: self.options.geometry_builder_mode,
                };
                kind.decode(&self.buf[4..], &ctx)
            };

            match decoded {
                Ok(geometry) => {
                    if !self.is_in_filter(&geometry) {
                        trace!("Record number {} is outside the spatial filter", record_number);
                        self.n_filtered += 1;
                        continue;
                    }
                    self.geometry = Some(geometry);
                    self.current_record_number = record_number;
                    return Ok(true);
                }
                Err(err) => {
                    if self.options.geometry_builder_mode == GeometryBuilderMode::SkipInvalidShapes {
                        self.skip(RecordError::InvalidGeometry { record_number: record_number, message: err.0 });
                        continue;
                    }
                    return Err(ShpError::InvalidGeometry { record_number: record_number, message: err.0 });
                }
            }
        }
    }

    /// Ok(false) iff the stream ends where the header says the file ends.
    fn check_stream_ends(&mut self) -> Result<bool, ShpError> {
        let mut extra = [ 0u8; 1 ];
        loop {
            match self.file.read(&mut extra) {
                Ok(0) => return Ok(false),
                Ok(_) => {
                    return Err(ShpError::Corrupt(format!("Stream continues past the {} bytes the file header declares", self.header.file_n_bytes)));
                }
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(ShpError::IOError(err)),
            }
        }
    }

    fn skip(&mut self, err: RecordError) {
        warn!("Skipping record: {}", err);
        self.errors.push(err);
        self.n_skipped += 1;
    }

    fn truncated(&self, err: io::Error) -> ShpError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ShpError::Corrupt(format!("File ends after {} bytes, but its header says it is {} bytes long", self.n_bytes_already_read, self.header.file_n_bytes))
        } else {
            ShpError::IOError(err)
        }
    }

    /// What a null-shape record reads as.
    fn empty_geometry(&self) -> Geometry {
        match self.header.shape_type.kind() {
            Some(kind) => kind.empty_geometry(),
            None => Geometry::Point(None),
        }
    }
}

impl<R: Read + Seek> ShpReader<R> {
    /// Rewinds to the first record. The error log and the skipped and
    /// filtered counts are kept.
    pub fn restart(&mut self) -> Result<(), ShpError> {
        self.file.seek(SeekFrom::Start(SHP_HEADER_LENGTH as u64))?;
        self.n_bytes_already_read = SHP_HEADER_LENGTH;
        self.next_record_number = 1;
        self.current_record_number = 0;
        self.geometry = None;
        self.failed = false;
        Ok(())
    }
}

impl<R: Read> Iterator for ShpReader<R> {
    type Item = Result<ShpRecord, ShpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.read_next() {
            Ok(false) => None,
            Ok(true) => {
                match self.take_geometry() {
                    Some(geometry) => Some(Ok(ShpRecord { record_number: self.current_record_number, geometry: geometry })),
                    None => None,
                }
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// Opens a ".shp" file by path.
pub fn open(path: &Path, options: ReaderOptions) -> Result<ShpReader<io::BufReader<fs::File>>, ShpError> {
    let f = fs::File::open(path)?;
    ShpReader::new(io::BufReader::new(f), options)
}
