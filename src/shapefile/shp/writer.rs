use std::io::{Seek, SeekFrom, Write};
use byteorder::{LittleEndian, WriteBytesExt};

use crate::geo::{Envelope, Geometry};
use crate::shapefile::layout::{write_index_entry, write_record_header, write_shp_header, SHP_HEADER_LENGTH, SHP_RECORD_HEADER_LENGTH, SHX_RECORD_LENGTH};
use super::{ShapeKind, ShapeType, ShpBoundingBox, ShpError, ShpHeader};

/// Largest file the 32-bit word count in the header can describe.
const MAX_FILE_N_BYTES: usize = (i32::max_value() as usize) * 2;

/// Writes a ".shp" file and its ".shx" index in lockstep.
///
/// Headers are written as placeholders and patched by `finish()`, so both
/// streams must be seekable.
#[derive(Debug)]
pub struct ShpWriter<W: Write + Seek, X: Write + Seek> {
    shp: W,
    shx: X,
    shape_type: ShapeType,
    kind: Option<ShapeKind>,
    n_bytes_written: usize,
    n_records: u32,
    envelope: Envelope,
    z_range: Option<(f64, f64)>,
    m_range: Option<(f64, f64)>,
    buf: Vec<u8>,
}

fn widen(range: Option<(f64, f64)>, other: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (range, other) {
        (Some((lo, hi)), Some((lo2, hi2))) => Some((lo.min(lo2), hi.max(hi2))),
        (a, b) => a.or(b),
    }
}

impl<W: Write + Seek, X: Write + Seek> ShpWriter<W, X> {
    pub fn new(mut shp: W, mut shx: X, shape_type: ShapeType) -> Result<ShpWriter<W, X>, ShpError> {
        let kind = shape_type.kind();
        if kind.is_none() && shape_type != ShapeType::Null {
            return Err(ShpError::WriteError(format!("Cannot write {:?} files", shape_type)));
        }

        let placeholder = ShpHeader {
            file_n_bytes: SHP_HEADER_LENGTH,
            shape_type: shape_type,
            bounding_box: ShpBoundingBox::default(),
        };
        write_shp_header(&mut shp, &placeholder)?;
        write_shp_header(&mut shx, &placeholder)?;

        Ok(ShpWriter {
            shp: shp,
            shx: shx,
            shape_type: shape_type,
            kind: kind,
            n_bytes_written: SHP_HEADER_LENGTH,
            n_records: 0,
            envelope: Envelope::null(),
            z_range: None,
            m_range: None,
            buf: Vec::new(),
        })
    }

    pub fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    pub fn record_count(&self) -> usize {
        self.n_records as usize
    }

    /// The bounding box of everything written so far.
    pub fn bounding_box(&self) -> ShpBoundingBox {
        ShpBoundingBox::from_ranges(
            &self.envelope,
            if self.shape_type.has_z() { self.z_range } else { None },
            if self.shape_type.has_m() { self.m_range } else { None },
        )
    }

    /// Appends one record. Empty geometries become null-shape records.
    pub fn write(&mut self, geometry: &Geometry) -> Result<(), ShpError> {
        let record_number = self.n_records + 1;
        self.buf.clear();

        if geometry.is_empty() {
            self.buf.write_u32::<LittleEndian>(ShapeType::Null.code())?;
        } else {
            let kind = match self.kind {
                Some(kind) => kind,
                None => return Err(ShpError::WriteError(format!("Record number {}: Null files cannot hold {}", record_number, geometry))),
            };
            kind.encode(geometry, self.shape_type, &mut self.buf)
                .map_err(|err| ShpError::WriteError(format!("Record number {}: {}", record_number, err)))?;
        }

        let content_n_bytes = self.buf.len();
        if self.n_bytes_written + SHP_RECORD_HEADER_LENGTH + content_n_bytes > MAX_FILE_N_BYTES {
            return Err(ShpError::WriteError(format!("Record number {} would make the file longer than {} bytes", record_number, MAX_FILE_N_BYTES)));
        }

        write_record_header(&mut self.shp, record_number, content_n_bytes)?;
        self.shp.write_all(&self.buf)?;
        write_index_entry(&mut self.shx, self.n_bytes_written, content_n_bytes)?;

        if !geometry.is_empty() {
            self.envelope.expand_to_include_envelope(&geometry.envelope());
            self.z_range = widen(self.z_range, geometry.z_range());
            self.m_range = widen(self.m_range, geometry.m_range());
        }

        self.n_bytes_written += SHP_RECORD_HEADER_LENGTH + content_n_bytes;
        self.n_records = record_number;
        Ok(())
    }

    /// Patches both headers and hands back the streams, positioned at their
    /// ends.
    pub fn finish(mut self) -> Result<(W, X), ShpError> {
        let bounding_box = self.bounding_box();
        debug!("Finishing {:?} file: {} records, {} bytes", self.shape_type, self.n_records, self.n_bytes_written);

        let shp_header = ShpHeader {
            file_n_bytes: self.n_bytes_written,
            shape_type: self.shape_type,
            bounding_box: bounding_box,
        };
        let shx_header = ShpHeader {
            file_n_bytes: SHP_HEADER_LENGTH + SHX_RECORD_LENGTH * self.n_records as usize,
            ..shp_header
        };

        self.shp.seek(SeekFrom::Start(0))?;
        write_shp_header(&mut self.shp, &shp_header)?;
        self.shp.seek(SeekFrom::End(0))?;
        self.shp.flush()?;

        self.shx.seek(SeekFrom::Start(0))?;
        write_shp_header(&mut self.shx, &shx_header)?;
        self.shx.seek(SeekFrom::End(0))?;
        self.shx.flush()?;

        Ok((self.shp, self.shx))
    }
}
