//! Per-shape-type record codecs.
//!
//! Every codec reads from (and writes to) a record's content _after_ its
//! 4-byte shape type. The reader engine has already checked that shape type.
use std::io;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::geo::{Coord, Envelope, Geometry, GeometryFactory};
use crate::shapefile::options::GeometryBuilderMode;
use super::ShapeType;

mod multipoint;
mod point;
mod polygon;
mod polyline;

/// Values below this are "no data" in M arrays.
pub const NO_DATA_THRESHOLD: f64 = -1.0e38;

/// What we write when a Coord has no M.
pub const NO_DATA: f64 = -1.0e39;

/// Why a record's content can't become a geometry.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct GeometryError(pub String);

impl From<io::Error> for GeometryError {
    fn from(err: io::Error) -> GeometryError {
        GeometryError(format!("record content is truncated ({})", err))
    }
}

/// Everything a codec needs to turn bytes into a geometry.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub shape_type: ShapeType,
    pub factory: &'a GeometryFactory,
    pub mode: GeometryBuilderMode,
}

impl<'a> DecodeContext<'a> {
    /// Strict and SkipInvalidShapes both refuse invalid structure; the reader
    /// decides what to do with the refusal.
    fn is_strict(&self) -> bool {
        match self.mode {
            GeometryBuilderMode::Strict | GeometryBuilderMode::SkipInvalidShapes => true,
            GeometryBuilderMode::FixInvalidShapes | GeometryBuilderMode::IgnoreInvalidShapes => false,
        }
    }
}

/// The four families of shape types. Z and M variants share a codec.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
}

impl ShapeKind {
    /// What a null-shape record reads as, in a file of this kind.
    pub fn empty_geometry(&self) -> Geometry {
        match *self {
            ShapeKind::Point => Geometry::Point(None),
            ShapeKind::PolyLine => Geometry::MultiLineString(vec![]),
            ShapeKind::Polygon => Geometry::MultiPolygon(vec![]),
            ShapeKind::MultiPoint => Geometry::MultiPoint(vec![]),
        }
    }

    /// The bounding box stored ahead of the coordinates, if this kind stores
    /// one. Lets the reader reject a record without parsing its coordinates.
    pub fn record_bounds(&self, content: &[u8]) -> Option<Envelope> {
        match *self {
            ShapeKind::Point => None,
            ShapeKind::PolyLine | ShapeKind::Polygon | ShapeKind::MultiPoint => {
                let mut rdr = content;
                read_bounds(&mut rdr).ok()
            }
        }
    }

    pub fn decode(&self, content: &[u8], ctx: &DecodeContext) -> Result<Geometry, GeometryError> {
        match *self {
            ShapeKind::Point => point::decode(content, ctx),
            ShapeKind::PolyLine => polyline::decode(content, ctx),
            ShapeKind::Polygon => polygon::decode(content, ctx),
            ShapeKind::MultiPoint => multipoint::decode(content, ctx),
        }
    }

    /// Appends the full record content, shape type first.
    ///
    /// `geometry` must not be empty: empty geometries are written as
    /// null-shape records.
    pub fn encode(&self, geometry: &Geometry, shape_type: ShapeType, out: &mut Vec<u8>) -> Result<(), GeometryError> {
        out.write_u32::<LittleEndian>(shape_type.code())?;
        match (*self, geometry) {
            (ShapeKind::Point, &Geometry::Point(Some(ref c))) => point::encode(c, shape_type, out),
            (ShapeKind::MultiPoint, &Geometry::MultiPoint(ref cs)) => multipoint::encode(cs, shape_type, out),
            (ShapeKind::PolyLine, &Geometry::MultiLineString(ref ls)) => polyline::encode(ls, shape_type, out),
            (ShapeKind::Polygon, &Geometry::MultiPolygon(ref ps)) => polygon::encode(ps, shape_type, out),
            _ => Err(GeometryError(format!("{:?} files cannot hold this geometry: {}", shape_type, geometry))),
        }
    }
}

fn m_value(m: f64) -> Option<f64> {
    if m.is_nan() || m < NO_DATA_THRESHOLD {
        None
    } else {
        Some(m)
    }
}

fn read_bounds(rdr: &mut &[u8]) -> io::Result<Envelope> {
    let x_min = rdr.read_f64::<LittleEndian>()?;
    let y_min = rdr.read_f64::<LittleEndian>()?;
    let x_max = rdr.read_f64::<LittleEndian>()?;
    let y_max = rdr.read_f64::<LittleEndian>()?;
    Ok(Envelope::new(x_min, y_min, x_max, y_max))
}

fn write_bounds(out: &mut Vec<u8>, envelope: &Envelope) -> io::Result<()> {
    for &v in [ envelope.min_x, envelope.min_y, envelope.max_x, envelope.max_y ].iter() {
        out.write_f64::<LittleEndian>(v)?;
    }
    Ok(())
}

fn read_count(rdr: &mut &[u8], what: &str) -> Result<usize, GeometryError> {
    let n = rdr.read_i32::<LittleEndian>()?;
    if n < 0 {
        return Err(GeometryError(format!("record has {} {}", n, what)));
    }
    Ok(n as usize)
}

/// Reads `(min, max, values...)`, returning the values.
fn read_range_block(rdr: &mut &[u8], n: usize) -> io::Result<Vec<f64>> {
    rdr.read_f64::<LittleEndian>()?;
    rdr.read_f64::<LittleEndian>()?;
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(rdr.read_f64::<LittleEndian>()?);
    }
    Ok(values)
}

/// Reads `n` XY pairs followed by the Z block (Z types) and the M block (if
/// the type allows M and the record has room for it).
fn read_coords(rdr: &mut &[u8], n: usize, ctx: &DecodeContext) -> Result<Vec<Coord>, GeometryError> {
    if n.saturating_mul(16) > rdr.len() {
        return Err(GeometryError(format!("record says it has {} points, but only {} bytes remain", n, rdr.len())));
    }

    let mut xys = Vec::with_capacity(n);
    for _ in 0..n {
        let x = rdr.read_f64::<LittleEndian>()?;
        let y = rdr.read_f64::<LittleEndian>()?;
        xys.push((x, y));
    }

    let zs = if ctx.shape_type.has_z() {
        Some(read_range_block(rdr, n)?)
    } else {
        None
    };

    // The M block is optional, even in M files
    let ms = if ctx.shape_type.has_m() && rdr.len() >= 16 + 8 * n {
        Some(read_range_block(rdr, n)?)
    } else {
        None
    };

    Ok(xys.into_iter().enumerate().map(|(i, (x, y))| {
        ctx.factory.coord(
            x,
            y,
            zs.as_ref().map(|zs| zs[i]),
            ms.as_ref().and_then(|ms| m_value(ms[i])),
        )
    }).collect())
}

/// Every Coord of a Z record must have a Z.
fn write_coords<'a, I: Iterator<Item=&'a Coord> + Clone>(out: &mut Vec<u8>, coords: I, shape_type: ShapeType) -> Result<(), GeometryError> {
    if shape_type.has_z() {
        if let Some(i) = coords.clone().position(|c| c.z.is_none()) {
            return Err(missing_z(i, shape_type));
        }
    }

    for c in coords.clone() {
        out.write_f64::<LittleEndian>(c.x)?;
        out.write_f64::<LittleEndian>(c.y)?;
    }

    if shape_type.has_z() {
        let zs: Vec<Option<f64>> = coords.clone().map(|c| c.z).collect();
        write_range_block(out, &zs, 0.0)?;
    }

    if shape_type.has_m() {
        let ms: Vec<Option<f64>> = coords.map(|c| c.m).collect();
        write_range_block(out, &ms, NO_DATA)?;
    }

    Ok(())
}

fn missing_z(i: usize, shape_type: ShapeType) -> GeometryError {
    GeometryError(format!("point {} has no Z, but {:?} files need one", i, shape_type))
}

/// Writes `(min, max, values...)`, with `missing` standing in for absent
/// values. Absent values don't count toward min and max.
fn write_range_block(out: &mut Vec<u8>, values: &[Option<f64>], missing: f64) -> io::Result<()> {
    let range = values.iter().filter_map(|&v| v).fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    });
    let (lo, hi) = range.unwrap_or((missing, missing));

    out.write_f64::<LittleEndian>(lo)?;
    out.write_f64::<LittleEndian>(hi)?;
    for v in values {
        out.write_f64::<LittleEndian>(v.unwrap_or(missing))?;
    }
    Ok(())
}

/// Reads the common layout of PolyLine and Polygon records: bounds, part
/// count, point count, part starts, then coordinates. Returns one Vec per
/// part.
fn read_parts(content: &[u8], ctx: &DecodeContext) -> Result<Vec<Vec<Coord>>, GeometryError> {
    let mut rdr = content;
    read_bounds(&mut rdr)?;
    let num_parts = read_count(&mut rdr, "parts")?;
    let num_points = read_count(&mut rdr, "points")?;

    if num_parts.saturating_mul(4) > rdr.len() {
        return Err(GeometryError(format!("record says it has {} parts, but only {} bytes remain", num_parts, rdr.len())));
    }

    let mut parts = Vec::with_capacity(num_parts);
    for _ in 0..num_parts {
        parts.push(read_count(&mut rdr, "as a part index")?);
    }

    let coords = read_coords(&mut rdr, num_points, ctx)?;
    split_parts(coords, &parts)
}

fn split_parts(mut coords: Vec<Coord>, parts: &[usize]) -> Result<Vec<Vec<Coord>>, GeometryError> {
    if parts.is_empty() {
        return Ok(vec![]);
    }

    if parts[0] != 0 {
        return Err(GeometryError(format!("first part starts at point {}, not 0", parts[0])));
    }

    for (i, &part_start) in parts.iter().enumerate() {
        let part_end = parts.get(i + 1).cloned().unwrap_or(coords.len());
        if part_start > part_end || part_end > coords.len() {
            return Err(GeometryError(format!("part {} spans points {}-{}, but there are only {} points", i, part_start, part_end, coords.len())));
        }
    }

    // split from the back so each split_off is cheap
    let mut ret = Vec::with_capacity(parts.len());
    for &part_start in parts.iter().rev() {
        ret.push(coords.split_off(part_start));
    }
    ret.reverse();
    Ok(ret)
}

/// Writes the common layout of PolyLine and Polygon records, after the shape
/// type.
fn write_parts(out: &mut Vec<u8>, parts: &[&[Coord]], shape_type: ShapeType) -> Result<(), GeometryError> {
    let mut envelope = Envelope::null();
    for c in parts.iter().flat_map(|p| p.iter()) {
        envelope.expand_to_include(c.x, c.y);
    }

    let num_points: usize = parts.iter().map(|p| p.len()).sum();
    if num_points > i32::max_value() as usize {
        return Err(GeometryError(format!("{} points do not fit in one record", num_points)));
    }

    write_bounds(out, &envelope)?;
    out.write_i32::<LittleEndian>(parts.len() as i32)?;
    out.write_i32::<LittleEndian>(num_points as i32)?;

    let mut start = 0;
    for part in parts {
        out.write_i32::<LittleEndian>(start as i32)?;
        start += part.len();
    }

    write_coords(out, parts.iter().flat_map(|p| p.iter()), shape_type)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use byteorder::ByteOrder;

    fn ctx<'a>(shape_type: ShapeType, factory: &'a GeometryFactory) -> DecodeContext<'a> {
        DecodeContext { shape_type: shape_type, factory: factory, mode: GeometryBuilderMode::Strict }
    }

    fn encode_then_decode(kind: ShapeKind, shape_type: ShapeType, geometry: &Geometry) -> Geometry {
        let factory = GeometryFactory::default();
        let mut buf = Vec::new();
        kind.encode(geometry, shape_type, &mut buf).unwrap();
        assert_eq!(shape_type.code(), LittleEndian::read_u32(&buf[0..4]));
        kind.decode(&buf[4..], &ctx(shape_type, &factory)).unwrap()
    }

    #[test]
    fn test_m_no_data() {
        assert_eq!(None, m_value(NO_DATA));
        assert_eq!(None, m_value(-2.0e38));
        assert_eq!(None, m_value(std::f64::NAN));
        assert_eq!(Some(-5.0), m_value(-5.0));
    }

    #[test]
    fn test_split_parts() {
        let coords: Vec<Coord> = (0..5).map(|i| Coord::xy(i as f64, 0.0)).collect();
        let parts = split_parts(coords.clone(), &[ 0, 2 ]).unwrap();
        assert_eq!(vec![ coords[0..2].to_vec(), coords[2..5].to_vec() ], parts);
    }

    #[test]
    fn test_split_parts_rejects_bad_indexes() {
        let coords: Vec<Coord> = (0..5).map(|i| Coord::xy(i as f64, 0.0)).collect();
        assert!(split_parts(coords.clone(), &[ 1, 3 ]).is_err());
        assert!(split_parts(coords.clone(), &[ 0, 3, 2 ]).is_err());
        assert!(split_parts(coords, &[ 0, 6 ]).is_err());
    }

    #[test]
    fn test_record_bounds_come_before_coords() {
        let geometry = Geometry::MultiPoint(vec![ Coord::xy(1.0, 5.0), Coord::xy(-3.0, 2.0) ]);
        let mut buf = Vec::new();
        ShapeKind::MultiPoint.encode(&geometry, ShapeType::MultiPoint, &mut buf).unwrap();
        assert_eq!(Some(Envelope::new(-3.0, 2.0, 1.0, 5.0)), ShapeKind::MultiPoint.record_bounds(&buf[4..]));
        assert_eq!(None, ShapeKind::Point.record_bounds(&buf[4..]));
    }

    #[test]
    fn test_round_trip_each_kind() {
        let cases = vec![
            (ShapeKind::Point, ShapeType::Point, Geometry::Point(Some(Coord::xy(1.5, -2.5)))),
            (ShapeKind::Point, ShapeType::PointZ, Geometry::Point(Some(Coord::new(1.0, 2.0, Some(3.0), Some(4.0))))),
            (ShapeKind::Point, ShapeType::PointM, Geometry::Point(Some(Coord::new(1.0, 2.0, None, None)))),
            (ShapeKind::MultiPoint, ShapeType::MultiPointM, Geometry::MultiPoint(vec![
                Coord::xym(0.0, 0.0, 1.0),
                Coord::new(1.0, 1.0, None, None),
            ])),
            (ShapeKind::PolyLine, ShapeType::PolyLineZ, Geometry::MultiLineString(vec![
                crate::geo::LineString(vec![ Coord::new(0.0, 0.0, Some(1.0), Some(7.0)), Coord::new(1.0, 1.0, Some(2.0), None) ]),
                crate::geo::LineString(vec![ Coord::new(5.0, 5.0, Some(0.0), Some(8.0)), Coord::new(6.0, 5.0, Some(-1.0), Some(9.0)) ]),
            ])),
        ];

        for (kind, shape_type, geometry) in cases {
            assert_eq!(geometry, encode_then_decode(kind, shape_type, &geometry), "{:?}", shape_type);
        }
    }

    #[test]
    fn test_encode_wrong_geometry_for_kind() {
        let mut buf = Vec::new();
        let err = ShapeKind::Polygon.encode(&Geometry::Point(Some(Coord::xy(0.0, 0.0))), ShapeType::Polygon, &mut buf);
        assert!(err.is_err());
    }

    #[test]
    fn test_encode_z_type_needs_z() {
        let geometry = Geometry::MultiPoint(vec![ Coord::xyz(0.0, 0.0, 1.0), Coord::xy(1.0, 1.0) ]);
        let mut buf = Vec::new();
        let err = ShapeKind::MultiPoint.encode(&geometry, ShapeType::MultiPointZ, &mut buf).unwrap_err();
        assert!(err.0.contains("point 1 has no Z"), "{}", err);

        let mut buf = Vec::new();
        assert!(ShapeKind::Point.encode(&Geometry::Point(Some(Coord::xy(1.0, 1.0))), ShapeType::PointZ, &mut buf).is_err());
    }

    #[test]
    fn test_z_record_without_m_block() {
        // PointZ records may stop after Z
        let mut buf = Vec::new();
        for &v in [ 1.0f64, 2.0, 3.0 ].iter() {
            buf.write_f64::<LittleEndian>(v).unwrap();
        }
        let factory = GeometryFactory::default();
        let geometry = ShapeKind::Point.decode(&buf, &ctx(ShapeType::PointZ, &factory)).unwrap();
        assert_eq!(Geometry::Point(Some(Coord::new(1.0, 2.0, Some(3.0), None))), geometry);
    }
}
