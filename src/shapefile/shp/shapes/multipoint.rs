use byteorder::{LittleEndian, WriteBytesExt};

use crate::geo::{Coord, Envelope, Geometry};
use super::{read_bounds, read_coords, read_count, write_bounds, write_coords, DecodeContext, GeometryError};
use crate::shapefile::shp::ShapeType;

/// Bounds, point count, then coordinates.
pub fn decode(content: &[u8], ctx: &DecodeContext) -> Result<Geometry, GeometryError> {
    let mut rdr = content;
    read_bounds(&mut rdr)?;
    let num_points = read_count(&mut rdr, "points")?;
    let coords = read_coords(&mut rdr, num_points, ctx)?;
    Ok(Geometry::MultiPoint(coords))
}

pub fn encode(coords: &[Coord], shape_type: ShapeType, out: &mut Vec<u8>) -> Result<(), GeometryError> {
    if coords.len() > i32::max_value() as usize {
        return Err(GeometryError(format!("{} points do not fit in one record", coords.len())));
    }

    let mut envelope = Envelope::null();
    for c in coords {
        envelope.expand_to_include(c.x, c.y);
    }

    write_bounds(out, &envelope)?;
    out.write_i32::<LittleEndian>(coords.len() as i32)?;
    write_coords(out, coords.iter(), shape_type)?;
    Ok(())
}
