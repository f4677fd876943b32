use crate::geo::{Coord, Geometry, LineString};
use crate::shapefile::options::GeometryBuilderMode;
use super::{read_parts, write_parts, DecodeContext, GeometryError};
use crate::shapefile::shp::ShapeType;

pub fn decode(content: &[u8], ctx: &DecodeContext) -> Result<Geometry, GeometryError> {
    let parts = read_parts(content, ctx)?;

    let mut lines = Vec::with_capacity(parts.len());
    for (i, mut part) in parts.into_iter().enumerate() {
        if part.len() < 2 {
            if ctx.is_strict() {
                return Err(GeometryError(format!("part {} has {} point(s), but a line needs 2", i, part.len())));
            }
            if ctx.mode == GeometryBuilderMode::FixInvalidShapes {
                match part.first().cloned() {
                    Some(c) => part.push(c),
                    None => continue,
                }
            }
        }
        lines.push(LineString(part));
    }

    Ok(Geometry::MultiLineString(lines))
}

pub fn encode(lines: &[LineString], shape_type: ShapeType, out: &mut Vec<u8>) -> Result<(), GeometryError> {
    let parts: Vec<&[Coord]> = lines.iter().map(|l| &l.0[..]).collect();
    write_parts(out, &parts, shape_type)
}
