use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::geo::{Coord, Geometry};
use super::{m_value, missing_z, DecodeContext, GeometryError, NO_DATA};
use crate::shapefile::shp::ShapeType;

/// X, Y, then Z (Z types) and M (M types, and optionally Z types).
pub fn decode(content: &[u8], ctx: &DecodeContext) -> Result<Geometry, GeometryError> {
    let mut rdr = content;
    let x = rdr.read_f64::<LittleEndian>()?;
    let y = rdr.read_f64::<LittleEndian>()?;

    let z = if ctx.shape_type.has_z() {
        Some(rdr.read_f64::<LittleEndian>()?)
    } else {
        None
    };

    let m = if ctx.shape_type.has_m() && rdr.len() >= 8 {
        m_value(rdr.read_f64::<LittleEndian>()?)
    } else {
        None
    };

    // Some writers store empty points as NaN instead of as null shapes
    if x.is_nan() && y.is_nan() {
        return Ok(Geometry::Point(None));
    }

    Ok(Geometry::Point(Some(ctx.factory.coord(x, y, z, m))))
}

pub fn encode(c: &Coord, shape_type: ShapeType, out: &mut Vec<u8>) -> Result<(), GeometryError> {
    out.write_f64::<LittleEndian>(c.x)?;
    out.write_f64::<LittleEndian>(c.y)?;
    if shape_type.has_z() {
        match c.z {
            Some(z) => out.write_f64::<LittleEndian>(z)?,
            None => return Err(missing_z(0, shape_type)),
        }
    }
    if shape_type.has_m() {
        out.write_f64::<LittleEndian>(c.m.unwrap_or(NO_DATA))?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geo::GeometryFactory;
    use crate::shapefile::options::GeometryBuilderMode;

    fn decode_with(shape_type: ShapeType, values: &[f64]) -> Result<Geometry, GeometryError> {
        let mut buf = Vec::new();
        for &v in values {
            buf.write_f64::<LittleEndian>(v).unwrap();
        }
        let factory = GeometryFactory::default();
        decode(&buf, &DecodeContext { shape_type: shape_type, factory: &factory, mode: GeometryBuilderMode::Strict })
    }

    #[test]
    fn test_decode_point() {
        assert_eq!(Geometry::Point(Some(Coord::xy(3.0, 4.0))), decode_with(ShapeType::Point, &[ 3.0, 4.0 ]).unwrap());
    }

    #[test]
    fn test_decode_point_m_no_data() {
        assert_eq!(Geometry::Point(Some(Coord::xy(3.0, 4.0))), decode_with(ShapeType::PointM, &[ 3.0, 4.0, NO_DATA ]).unwrap());
    }

    #[test]
    fn test_decode_nan_point_is_empty() {
        assert_eq!(Geometry::Point(None), decode_with(ShapeType::Point, &[ std::f64::NAN, std::f64::NAN ]).unwrap());
    }

    #[test]
    fn test_decode_truncated_point() {
        assert!(decode_with(ShapeType::PointZ, &[ 3.0, 4.0 ]).is_err());
    }

    #[test]
    fn test_encode_point_z_writes_m() {
        let mut buf = Vec::new();
        encode(&Coord::xyz(1.0, 2.0, 3.0), ShapeType::PointZ, &mut buf).unwrap();
        assert_eq!(32, buf.len());
    }
}
