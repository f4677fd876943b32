use crate::geo::{signed_area2, Coord, Geometry, LineString, Polygon, WindingOrder};
use crate::shapefile::options::GeometryBuilderMode;
use super::{read_parts, write_parts, DecodeContext, GeometryError};
use crate::shapefile::shp::ShapeType;

/// Reads a Polygon record.
///
/// Rings are classified by winding order: clockwise rings are shells and
/// counter-clockwise rings are holes. Each hole joins the smallest shell that
/// covers it. A record with no clockwise ring at all is read as shells only,
/// with each ring's coordinates as stored.
pub fn decode(content: &[u8], ctx: &DecodeContext) -> Result<Geometry, GeometryError> {
    let parts = read_parts(content, ctx)?;

    let mut shells: Vec<LineString> = Vec::new();
    let mut holes: Vec<LineString> = Vec::new();

    for (i, part) in parts.into_iter().enumerate() {
        let ring = match build_ring(i, part, ctx)? {
            Some(ring) => ring,
            None => continue,
        };

        match ring.winding_order() {
            WindingOrder::Clockwise => shells.push(ring),
            WindingOrder::CounterClockwise => holes.push(ring),
        }
    }

    // Some writers store every shell counter-clockwise
    if shells.is_empty() {
        shells = holes;
        holes = Vec::new();
    }

    let mut polygons: Vec<Polygon> = shells.into_iter()
        .map(|shell| Polygon { exterior: shell, interiors: vec![] })
        .collect();

    for hole in holes {
        match find_shell(&polygons, &hole) {
            Some(i) => polygons[i].interiors.push(hole),
            None => {
                match ctx.mode {
                    GeometryBuilderMode::FixInvalidShapes => {
                        let mut coords = hole.0;
                        coords.reverse();
                        polygons.push(Polygon { exterior: LineString(coords), interiors: vec![] });
                    }
                    GeometryBuilderMode::IgnoreInvalidShapes => {
                        polygons.push(Polygon { exterior: hole, interiors: vec![] });
                    }
                    GeometryBuilderMode::Strict | GeometryBuilderMode::SkipInvalidShapes => {
                        return Err(GeometryError(format!("hole starting at ({}) is not inside any shell", hole.0[0])));
                    }
                }
            }
        }
    }

    Ok(Geometry::MultiPolygon(polygons))
}

/// Checks one ring. Returns None when the ring should be dropped.
fn build_ring(i: usize, mut coords: Vec<Coord>, ctx: &DecodeContext) -> Result<Option<LineString>, GeometryError> {
    let fix = ctx.mode == GeometryBuilderMode::FixInvalidShapes;

    if coords.is_empty() {
        if ctx.is_strict() {
            return Err(GeometryError(format!("ring {} has no points", i)));
        }
        return Ok(None);
    }

    if !LineString(coords.clone()).is_closed() {
        if ctx.is_strict() {
            return Err(GeometryError(format!("ring {} is not closed", i)));
        }
        if fix {
            let first = coords[0];
            coords.push(first);
        }
    }

    if coords.len() < 4 {
        if ctx.is_strict() {
            return Err(GeometryError(format!("ring {} has {} points, but a ring needs 4", i, coords.len())));
        }
        if fix {
            let first = coords[0];
            while coords.len() < 4 {
                coords.push(first);
            }
        }
    }

    Ok(Some(LineString(coords)))
}

/// Index of the smallest shell that covers every vertex of `hole`.
fn find_shell(polygons: &[Polygon], hole: &LineString) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (i, polygon) in polygons.iter().enumerate() {
        let shell = Polygon { exterior: polygon.exterior.clone(), interiors: vec![] };
        if !hole.0.iter().all(|c| shell.contains_coord(c)) {
            continue;
        }

        let area = signed_area2(polygon.exterior.0.iter()).abs();
        match best {
            Some((_, best_area)) if best_area <= area => {}
            _ => best = Some((i, area)),
        }
    }

    best.map(|(i, _)| i)
}

fn oriented(ring: &LineString, order: WindingOrder) -> Vec<Coord> {
    let mut coords = ring.0.clone();
    if ring.winding_order() != order {
        coords.reverse();
    }
    coords
}

/// Writes shells clockwise and holes counter-clockwise, whatever order they
/// are in memory.
pub fn encode(polygons: &[Polygon], shape_type: ShapeType, out: &mut Vec<u8>) -> Result<(), GeometryError> {
    let mut rings: Vec<Vec<Coord>> = Vec::new();
    for polygon in polygons {
        rings.push(oriented(&polygon.exterior, WindingOrder::Clockwise));
        for hole in polygon.interiors.iter() {
            rings.push(oriented(hole, WindingOrder::CounterClockwise));
        }
    }

    let parts: Vec<&[Coord]> = rings.iter().map(|r| &r[..]).collect();
    write_parts(out, &parts, shape_type)
}
