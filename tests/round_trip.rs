extern crate encoding;
extern crate shpio;
extern crate tempfile;

use std::io::Cursor;
use shpio::geo::{Coord, Geometry, LineString, Polygon};
use shpio::shapefile::ReaderOptions;
use shpio::shapefile::shp::{ShapeType, ShpReader, ShpWriter};

fn coord(shape_type: ShapeType, x: f64, y: f64, i: usize) -> Coord {
    let z = if shape_type.has_z() { Some(i as f64 * 10.0) } else { None };
    // every third measure is missing
    let m = if shape_type.has_m() && i % 3 != 0 { Some(i as f64 / 2.0) } else { None };
    Coord::new(x, y, z, m)
}

fn ring(shape_type: ShapeType, x0: f64, y0: f64, size: f64, clockwise: bool) -> LineString {
    let mut corners = vec![ (x0, y0), (x0, y0 + size), (x0 + size, y0 + size), (x0 + size, y0) ];
    if !clockwise {
        corners.reverse();
    }
    let mut coords: Vec<Coord> = corners.iter().enumerate().map(|(i, &(x, y))| coord(shape_type, x, y, i)).collect();
    let first = coords[0];
    coords.push(first);
    LineString(coords)
}

fn geometries(shape_type: ShapeType) -> Vec<Geometry> {
    let t = shape_type;
    match shape_type.kind() {
        Some(shpio::shapefile::shp::ShapeKind::Point) => vec![
            Geometry::Point(Some(coord(t, 1.5, -2.5, 1))),
            Geometry::Point(None),
            Geometry::Point(Some(coord(t, -180.0, 90.0, 2))),
        ],
        Some(shpio::shapefile::shp::ShapeKind::MultiPoint) => vec![
            Geometry::MultiPoint((0..5).map(|i| coord(t, i as f64, i as f64 * 2.0, i)).collect()),
            Geometry::MultiPoint(vec![]),
            Geometry::MultiPoint(vec![ coord(t, 7.0, 7.0, 1) ]),
        ],
        Some(shpio::shapefile::shp::ShapeKind::PolyLine) => vec![
            Geometry::MultiLineString(vec![
                LineString((0..4).map(|i| coord(t, i as f64, 0.0, i)).collect()),
                LineString(vec![ coord(t, 10.0, 10.0, 1), coord(t, 11.0, 12.0, 2) ]),
            ]),
            Geometry::MultiLineString(vec![]),
        ],
        Some(shpio::shapefile::shp::ShapeKind::Polygon) => vec![
            Geometry::MultiPolygon(vec![
                Polygon {
                    exterior: ring(t, 0.0, 0.0, 10.0, true),
                    interiors: vec![ ring(t, 2.0, 2.0, 2.0, false), ring(t, 6.0, 6.0, 2.0, false) ],
                },
                Polygon { exterior: ring(t, 20.0, 20.0, 5.0, true), interiors: vec![] },
            ]),
            Geometry::MultiPolygon(vec![]),
        ],
        None => vec![ Geometry::Point(None) ],
    }
}

const SHAPE_TYPES: [ShapeType; 13] = [
    ShapeType::Null,
    ShapeType::Point,
    ShapeType::PolyLine,
    ShapeType::Polygon,
    ShapeType::MultiPoint,
    ShapeType::PointZ,
    ShapeType::PolyLineZ,
    ShapeType::PolygonZ,
    ShapeType::MultiPointZ,
    ShapeType::PointM,
    ShapeType::PolyLineM,
    ShapeType::PolygonM,
    ShapeType::MultiPointM,
];

#[test]
fn every_shape_type_survives_write_then_read() {
    for &shape_type in SHAPE_TYPES.iter() {
        let input = geometries(shape_type);

        let mut writer = ShpWriter::new(Cursor::new(vec![]), Cursor::new(vec![]), shape_type).unwrap();
        for geometry in input.iter() {
            writer.write(geometry).unwrap();
        }
        let (shp, _) = writer.finish().unwrap();

        let reader = ShpReader::new(Cursor::new(shp.into_inner()), ReaderOptions::default()).unwrap();
        assert_eq!(shape_type, reader.header().shape_type);

        let output: Vec<Geometry> = reader.map(|r| r.unwrap().geometry).collect();
        assert_eq!(input, output, "{:?}", shape_type);
    }
}

#[test]
fn record_numbers_count_from_one() {
    let mut writer = ShpWriter::new(Cursor::new(vec![]), Cursor::new(vec![]), ShapeType::MultiPoint).unwrap();
    for i in 0..25 {
        writer.write(&Geometry::MultiPoint(vec![ Coord::xy(i as f64, 0.0) ])).unwrap();
    }
    let (shp, _) = writer.finish().unwrap();

    let mut reader = ShpReader::new(Cursor::new(shp.into_inner()), ReaderOptions::default()).unwrap();
    let mut n = 0;
    while reader.read_next().unwrap() {
        n += 1;
        assert_eq!(n, reader.current_record_number());
    }
    assert_eq!(25, n);
    assert!(!reader.read_next().unwrap());
}

#[test]
fn header_box_covers_every_record() {
    let mut writer = ShpWriter::new(Cursor::new(vec![]), Cursor::new(vec![]), ShapeType::PolyLineZ).unwrap();
    for geometry in geometries(ShapeType::PolyLineZ).iter() {
        writer.write(geometry).unwrap();
    }
    let (shp, _) = writer.finish().unwrap();
    let reader = ShpReader::new(Cursor::new(shp.into_inner()), ReaderOptions::default()).unwrap();

    let bbox = reader.header().bounding_box;
    let envelope = bbox.envelope();
    assert_eq!((0.0, 0.0, 11.0, 12.0), (envelope.min_x, envelope.min_y, envelope.max_x, envelope.max_y));
    assert_eq!((0.0, 30.0), (bbox.z_min, bbox.z_max));
    assert_eq!((0.5, 1.0), (bbox.m_min, bbox.m_max));
}
