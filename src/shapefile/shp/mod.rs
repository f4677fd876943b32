//! Reads and writes ESRI ".shp" Shapefiles (and their ".shx" indexes), as per
//! https://www.esri.com/library/whitepapers/pdfs/shapefile.pdf
use std::io;
use thiserror::Error;

use crate::geo::Envelope;

mod reader;
mod writer;
pub mod shapes;

pub use self::reader::{open, ShpReader, ShpRecord};
pub use self::writer::ShpWriter;
pub use self::shapes::ShapeKind;

#[derive(Debug, Error)]
pub enum ShpError {
    #[error("{0}")]
    IOError(#[from] io::Error),

    /// The file header is not one we can read.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The file contradicts itself: lengths that don't add up, or a file that
    /// ends before its header says it should.
    #[error("Corrupt file: {0}")]
    Corrupt(String),

    #[error("Corrupt file: found record number {found}, expected {expected}")]
    OutOfSequence { expected: u32, found: u32 },

    #[error("Record number {record_number} has an invalid geometry: {message}")]
    InvalidGeometry { record_number: u32, message: String },

    #[error("Cannot write record: {0}")]
    WriteError(String),

    #[error("The reader failed on an earlier record; restart() it before reading again")]
    ReaderFailed,
}

/// A problem with one record that the reader stepped over.
///
/// Readers collect these in `ShpReader::errors()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("Record number {record_number} has shape type {found}, expected {expected:?}")]
    TypeMismatch { record_number: u32, expected: ShapeType, found: u32 },

    #[error("Record number {record_number} has an invalid geometry: {message}")]
    InvalidGeometry { record_number: u32, message: String },
}

impl RecordError {
    pub fn record_number(&self) -> u32 {
        match *self {
            RecordError::TypeMismatch { record_number, .. } => record_number,
            RecordError::InvalidGeometry { record_number, .. } => record_number,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
    MultiPatch,
}

impl ShapeType {
    pub fn with_u32(u: u32) -> Option<ShapeType> {
        match u {
            0  => Some(ShapeType::Null),
            1  => Some(ShapeType::Point),
            3  => Some(ShapeType::PolyLine),
            5  => Some(ShapeType::Polygon),
            8  => Some(ShapeType::MultiPoint),
            11 => Some(ShapeType::PointZ),
            13 => Some(ShapeType::PolyLineZ),
            15 => Some(ShapeType::PolygonZ),
            18 => Some(ShapeType::MultiPointZ),
            21 => Some(ShapeType::PointM),
            23 => Some(ShapeType::PolyLineM),
            25 => Some(ShapeType::PolygonM),
            28 => Some(ShapeType::MultiPointM),
            31 => Some(ShapeType::MultiPatch),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        match *self {
            ShapeType::Null => 0,
            ShapeType::Point => 1,
            ShapeType::PolyLine => 3,
            ShapeType::Polygon => 5,
            ShapeType::MultiPoint => 8,
            ShapeType::PointZ => 11,
            ShapeType::PolyLineZ => 13,
            ShapeType::PolygonZ => 15,
            ShapeType::MultiPointZ => 18,
            ShapeType::PointM => 21,
            ShapeType::PolyLineM => 23,
            ShapeType::PolygonM => 25,
            ShapeType::MultiPointM => 28,
            ShapeType::MultiPatch => 31,
        }
    }

    /// The codec that reads and writes this type; None for Null and
    /// MultiPatch.
    pub fn kind(&self) -> Option<ShapeKind> {
        match *self {
            ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => Some(ShapeKind::Point),
            ShapeType::PolyLine | ShapeType::PolyLineZ | ShapeType::PolyLineM => Some(ShapeKind::PolyLine),
            ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => Some(ShapeKind::Polygon),
            ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => Some(ShapeKind::MultiPoint),
            ShapeType::Null | ShapeType::MultiPatch => None,
        }
    }

    pub fn has_z(&self) -> bool {
        match *self {
            ShapeType::PointZ | ShapeType::PolyLineZ | ShapeType::PolygonZ | ShapeType::MultiPointZ | ShapeType::MultiPatch => true,
            _ => false,
        }
    }

    /// True for M types and Z types: Z records may carry measures too.
    pub fn has_m(&self) -> bool {
        self.has_z() || match *self {
            ShapeType::PointM | ShapeType::PolyLineM | ShapeType::PolygonM | ShapeType::MultiPointM => true,
            _ => false,
        }
    }
}

/// The header's bounding box, in file order.
///
/// Z and M ranges are 0 when the file's shape type has no Z or M.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ShpBoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
    pub m_min: f64,
    pub m_max: f64,
}

impl ShpBoundingBox {
    pub fn from_ranges(envelope: &Envelope, z: Option<(f64, f64)>, m: Option<(f64, f64)>) -> ShpBoundingBox {
        let (x_min, y_min, x_max, y_max) = if envelope.is_null() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            (envelope.min_x, envelope.min_y, envelope.max_x, envelope.max_y)
        };
        let (z_min, z_max) = z.unwrap_or((0.0, 0.0));
        let (m_min, m_max) = m.unwrap_or((0.0, 0.0));

        ShpBoundingBox {
            x_min: x_min,
            y_min: y_min,
            x_max: x_max,
            y_max: y_max,
            z_min: z_min,
            z_max: z_max,
            m_min: m_min,
            m_max: m_max,
        }
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::new(self.x_min, self.y_min, self.x_max, self.y_max)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShpHeader {
    /// Declared length of the whole file, header included.
    pub file_n_bytes: usize,
    pub shape_type: ShapeType,
    pub bounding_box: ShpBoundingBox,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shape_type_codes_round_trip() {
        for code in 0..40 {
            if let Some(shape_type) = ShapeType::with_u32(code) {
                assert_eq!(code, shape_type.code());
            }
        }
        assert_eq!(None, ShapeType::with_u32(2));
    }

    #[test]
    fn test_z_types_carry_m() {
        assert!(ShapeType::PolygonZ.has_z());
        assert!(ShapeType::PolygonZ.has_m());
        assert!(!ShapeType::PolygonM.has_z());
        assert!(ShapeType::PolygonM.has_m());
        assert!(!ShapeType::Polygon.has_m());
    }

    #[test]
    fn test_kind() {
        assert_eq!(Some(ShapeKind::Polygon), ShapeType::PolygonM.kind());
        assert_eq!(Some(ShapeKind::MultiPoint), ShapeType::MultiPointZ.kind());
        assert_eq!(None, ShapeType::Null.kind());
    }

    #[test]
    fn test_bounding_box_of_nothing_is_zero() {
        assert_eq!(ShpBoundingBox::default(), ShpBoundingBox::from_ranges(&Envelope::null(), None, None));
    }
}
