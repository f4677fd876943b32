use std::fmt;
use itertools::Itertools;

mod factory;

pub use self::factory::{GeometryFactory, PrecisionModel};

/// A place in space, with optional elevation (Z) and measure (M).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl Coord {
    pub fn new(x: f64, y: f64, z: Option<f64>, m: Option<f64>) -> Coord {
        Coord { x: x, y: y, z: z, m: m }
    }

    pub fn xy(x: f64, y: f64) -> Coord {
        Coord { x: x, y: y, z: None, m: None }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Coord {
        Coord { x: x, y: y, z: Some(z), m: None }
    }

    pub fn xym(x: f64, y: f64, m: f64) -> Coord {
        Coord { x: x, y: y, z: None, m: Some(m) }
    }

    fn same_xy(&self, other: &Coord) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.x, self.y)?;
        if let Some(z) = self.z {
            write!(f, " {}", z)?;
        }
        if let Some(m) = self.m {
            write!(f, " m={}", m)?;
        }
        Ok(())
    }
}

/// Minimum bounding rectangle.
///
/// A "null" envelope contains nothing: its minimums are larger than its
/// maximums. Expanding a null envelope by a point makes it that point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for Envelope {
    fn default() -> Envelope {
        Envelope::null()
    }
}

impl Envelope {
    /// Builds an envelope from two corners, in any order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Envelope {
        Envelope {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    pub fn null() -> Envelope {
        Envelope {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn is_null(&self) -> bool {
        self.max_x < self.min_x || self.max_y < self.min_y
    }

    pub fn expand_to_include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn expand_to_include_envelope(&mut self, other: &Envelope) {
        if !other.is_null() {
            self.expand_to_include(other.min_x, other.min_y);
            self.expand_to_include(other.max_x, other.max_y);
        }
    }

    /// True iff the two rectangles share at least one point. Touching edges
    /// count.
    pub fn intersects(&self, other: &Envelope) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        other.min_x <= self.max_x
            && other.max_x >= self.min_x
            && other.min_y <= self.max_y
            && other.max_y >= self.min_y
    }

    pub fn contains_coord(&self, c: &Coord) -> bool {
        !self.is_null() && c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    /// The rectangle as a polygon, with a clockwise shell.
    pub fn to_geometry(&self) -> Geometry {
        if self.is_null() {
            return Geometry::MultiPolygon(vec![]);
        }
        let ring = LineString(vec![
            Coord::xy(self.min_x, self.min_y),
            Coord::xy(self.min_x, self.max_y),
            Coord::xy(self.max_x, self.max_y),
            Coord::xy(self.max_x, self.min_y),
            Coord::xy(self.min_x, self.min_y),
        ]);
        Geometry::MultiPolygon(vec![Polygon { exterior: ring, interiors: vec![] }])
    }
}

/// A path through any number of Coords.
///
/// When used as a polygon ring, the first and last Coords are identical.
#[derive(Clone, Debug, PartialEq)]
pub struct LineString(pub Vec<Coord>);

impl LineString {
    pub fn is_closed(&self) -> bool {
        match (self.0.first(), self.0.last()) {
            (Some(first), Some(last)) => first.same_xy(last),
            _ => false,
        }
    }

    pub fn winding_order(&self) -> WindingOrder {
        winding_order(self.0.iter())
    }

    fn segments<'a>(&'a self) -> impl Iterator<Item=(&'a Coord, &'a Coord)> + 'a {
        self.0.iter().tuple_windows()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub exterior: LineString,
    pub interiors: Vec<LineString>,
}

impl Polygon {
    fn rings(&self) -> impl Iterator<Item=&LineString> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    /// True iff `c` is inside the polygon or on its boundary.
    pub fn contains_coord(&self, c: &Coord) -> bool {
        for ring in self.rings() {
            if ring.segments().any(|(a, b)| on_segment(c, a, b)) {
                return true;
            }
        }
        point_in_ring(c, &self.exterior.0) && !self.interiors.iter().any(|hole| point_in_ring(c, &hole.0))
    }
}

/// Everything a ".shp" record can describe.
///
/// `Point(None)` and empty vectors are the "empty" geometries produced by
/// null-shape records.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point(Option<Coord>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<LineString>),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        match *self {
            Geometry::Point(ref c) => c.is_none(),
            Geometry::MultiPoint(ref cs) => cs.is_empty(),
            Geometry::MultiLineString(ref ls) => ls.iter().all(|l| l.0.is_empty()),
            Geometry::MultiPolygon(ref ps) => ps.iter().all(|p| p.exterior.0.is_empty()),
        }
    }

    /// All Coords, in storage order.
    pub fn coords<'a>(&'a self) -> Box<dyn Iterator<Item=&'a Coord> + 'a> {
        match *self {
            Geometry::Point(ref c) => Box::new(c.iter()),
            Geometry::MultiPoint(ref cs) => Box::new(cs.iter()),
            Geometry::MultiLineString(ref ls) => Box::new(ls.iter().flat_map(|l| l.0.iter())),
            Geometry::MultiPolygon(ref ps) => Box::new(ps.iter().flat_map(|p| p.rings()).flat_map(|r| r.0.iter())),
        }
    }

    pub fn envelope(&self) -> Envelope {
        let mut envelope = Envelope::null();
        for c in self.coords() {
            envelope.expand_to_include(c.x, c.y);
        }
        envelope
    }

    /// (min, max) of all Z values, or None when no Coord has one.
    pub fn z_range(&self) -> Option<(f64, f64)> {
        min_max(self.coords().filter_map(|c| c.z))
    }

    /// (min, max) of all M values, or None when no Coord has one.
    pub fn m_range(&self) -> Option<(f64, f64)> {
        min_max(self.coords().filter_map(|c| c.m))
    }

    fn segments<'a>(&'a self) -> Box<dyn Iterator<Item=(&'a Coord, &'a Coord)> + 'a> {
        match *self {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Box::new(std::iter::empty()),
            Geometry::MultiLineString(ref ls) => Box::new(ls.iter().flat_map(|l| l.segments())),
            Geometry::MultiPolygon(ref ps) => Box::new(ps.iter().flat_map(|p| p.rings()).flat_map(|r| r.segments())),
        }
    }

    fn puntal_coords(&self) -> &[Coord] {
        match *self {
            Geometry::Point(Some(ref c)) => std::slice::from_ref(c),
            Geometry::MultiPoint(ref cs) => cs,
            _ => &[],
        }
    }

    fn polygons(&self) -> &[Polygon] {
        match *self {
            Geometry::MultiPolygon(ref ps) => ps,
            _ => &[],
        }
    }

    /// True iff the two geometries share at least one point.
    ///
    /// Exact for points, lines and polygons (holes included); touching
    /// boundaries count as intersecting.
    pub fn intersects(&self, other: &Geometry) -> bool {
        if self.is_empty() || other.is_empty() || !self.envelope().intersects(&other.envelope()) {
            return false;
        }

        for (a1, a2) in self.segments() {
            for (b1, b2) in other.segments() {
                if segments_intersect(a1, a2, b1, b2) {
                    return true;
                }
            }
        }

        one_way_intersects(self, other) || one_way_intersects(other, self)
    }
}

fn one_way_intersects(a: &Geometry, b: &Geometry) -> bool {
    for p in a.puntal_coords() {
        if b.puntal_coords().iter().any(|q| p.same_xy(q)) {
            return true;
        }
        if b.segments().any(|(s1, s2)| on_segment(p, s1, s2)) {
            return true;
        }
    }

    // catches one geometry lying entirely inside a polygon of the other
    a.coords().any(|c| b.polygons().iter().any(|poly| poly.contains_coord(c)))
}

fn min_max<I: Iterator<Item=f64>>(values: I) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn cross(o: &Coord, a: &Coord, b: &Coord) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn on_segment(p: &Coord, a: &Coord, b: &Coord) -> bool {
    cross(a, b, p) == 0.0
        && p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(a1: &Coord, a2: &Coord, b1: &Coord, b2: &Coord) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0)) {
        return true;
    }

    on_segment(a1, b1, b2) || on_segment(a2, b1, b2) || on_segment(b1, a1, a2) || on_segment(b2, a1, a2)
}

/// Even-odd test. Points on the boundary may land either way.
pub fn point_in_ring(p: &Coord, ring: &[Coord]) -> bool {
    let mut inside = false;
    for (a, b) in ring.iter().tuple_windows() {
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindingOrder {
    Clockwise,
    CounterClockwise,
}

/// Returns 2*area, negative iff the ring is clockwise.
///
/// Assumes Y grows northward, as in every GIS coordinate system, and that the
/// first and last Coords are identical.
pub fn signed_area2<'a, T: IntoIterator<Item=&'a Coord>>(coords: T) -> f64 {
    // https://en.wikipedia.org/wiki/Shoelace_formula
    let mut a = 0.0;

    for (c1, c2) in coords.into_iter().tuple_windows() {
        a += c1.x * c2.y - c2.x * c1.y;
    }

    a
}

/// A zero-area ring is considered to be Clockwise.
pub fn winding_order<'a, T: IntoIterator<Item=&'a Coord>>(coords: T) -> WindingOrder {
    if signed_area2(coords) <= 0.0 {
        WindingOrder::Clockwise
    } else {
        WindingOrder::CounterClockwise
    }
}

struct DisplayCoords<'a>(&'a [Coord]);
impl<'a> fmt::Display for DisplayCoords<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            let name = match *self {
                Geometry::Point(_) => "POINT",
                Geometry::MultiPoint(_) => "MULTIPOINT",
                Geometry::MultiLineString(_) => "MULTILINESTRING",
                Geometry::MultiPolygon(_) => "MULTIPOLYGON",
            };
            return write!(f, "{} EMPTY", name);
        }

        match *self {
            Geometry::Point(Some(ref c)) => write!(f, "POINT ({})", c),
            Geometry::Point(None) => unreachable!(),
            Geometry::MultiPoint(ref cs) => write!(f, "MULTIPOINT {}", DisplayCoords(cs)),
            Geometry::MultiLineString(ref ls) => {
                write!(f, "MULTILINESTRING (")?;
                for (i, l) in ls.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", DisplayCoords(&l.0))?;
                }
                write!(f, ")")
            }
            Geometry::MultiPolygon(ref ps) => {
                write!(f, "MULTIPOLYGON (")?;
                for (i, p) in ps.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "(")?;
                    for (j, r) in p.rings().enumerate() {
                        if j > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", DisplayCoords(&r.0))?;
                    }
                    write!(f, ")")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> LineString {
        // clockwise
        LineString(vec![
            Coord::xy(x0, y0),
            Coord::xy(x0, y0 + size),
            Coord::xy(x0 + size, y0 + size),
            Coord::xy(x0 + size, y0),
            Coord::xy(x0, y0),
        ])
    }

    #[test]
    fn test_envelope_null_until_expanded() {
        let mut e = Envelope::null();
        assert!(e.is_null());
        e.expand_to_include(3.0, -1.0);
        assert!(!e.is_null());
        assert_eq!(Envelope::new(3.0, -1.0, 3.0, -1.0), e);
    }

    #[test]
    fn test_envelope_intersects_touching_edges() {
        let a = Envelope::new(0.0, 0.0, 1.0, 1.0);
        assert!(a.intersects(&Envelope::new(1.0, 1.0, 2.0, 2.0)));
        assert!(!a.intersects(&Envelope::new(1.1, 0.0, 2.0, 1.0)));
        assert!(!a.intersects(&Envelope::null()));
    }

    #[test]
    fn test_winding_order() {
        let ring = square(0.0, 0.0, 2.0);
        assert_eq!(WindingOrder::Clockwise, ring.winding_order());
        let mut reversed = ring.0.clone();
        reversed.reverse();
        assert_eq!(WindingOrder::CounterClockwise, winding_order(reversed.iter()));
        assert_eq!(-8.0, signed_area2(ring.0.iter()));
    }

    #[test]
    fn test_polygon_contains_respects_holes() {
        let mut hole = square(4.0, 4.0, 2.0).0;
        hole.reverse();
        let polygon = Polygon { exterior: square(0.0, 0.0, 10.0), interiors: vec![LineString(hole)] };
        assert!(polygon.contains_coord(&Coord::xy(1.0, 1.0)));
        assert!(!polygon.contains_coord(&Coord::xy(5.0, 5.0)));
        assert!(polygon.contains_coord(&Coord::xy(4.0, 5.0))); // on the hole's boundary
        assert!(!polygon.contains_coord(&Coord::xy(11.0, 5.0)));
    }

    #[test]
    fn test_intersects_point_in_polygon() {
        let polygon = Geometry::MultiPolygon(vec![Polygon { exterior: square(0.0, 0.0, 10.0), interiors: vec![] }]);
        assert!(polygon.intersects(&Geometry::Point(Some(Coord::xy(5.0, 5.0)))));
        assert!(!polygon.intersects(&Geometry::Point(Some(Coord::xy(15.0, 5.0)))));
    }

    #[test]
    fn test_intersects_line_crossing_box_without_vertices_inside() {
        let line = Geometry::MultiLineString(vec![LineString(vec![Coord::xy(-5.0, 5.0), Coord::xy(15.0, 5.0)])]);
        let filter = Envelope::new(0.0, 0.0, 10.0, 10.0).to_geometry();
        assert!(line.intersects(&filter));
        assert!(filter.intersects(&line));
    }

    #[test]
    fn test_intersects_line_near_corner_misses() {
        // the envelopes overlap, but the diagonal passes outside the box
        let line = Geometry::MultiLineString(vec![LineString(vec![Coord::xy(9.0, 12.0), Coord::xy(12.0, 9.0)])]);
        let filter = Envelope::new(0.0, 0.0, 10.0, 10.0).to_geometry();
        assert!(line.envelope().intersects(&Envelope::new(0.0, 0.0, 10.0, 10.0)));
        assert!(!line.intersects(&filter));
    }

    #[test]
    fn test_intersects_polygon_inside_polygon() {
        let outer = Geometry::MultiPolygon(vec![Polygon { exterior: square(0.0, 0.0, 10.0), interiors: vec![] }]);
        let inner = Geometry::MultiPolygon(vec![Polygon { exterior: square(2.0, 2.0, 1.0), interiors: vec![] }]);
        assert!(outer.intersects(&inner));
        assert!(inner.intersects(&outer));
    }

    #[test]
    fn test_empty_geometries_never_intersect() {
        let filter = Envelope::new(0.0, 0.0, 10.0, 10.0).to_geometry();
        assert!(!Geometry::Point(None).intersects(&filter));
        assert!(!Geometry::MultiPoint(vec![]).intersects(&filter));
    }

    #[test]
    fn test_z_and_m_ranges() {
        let g = Geometry::MultiPoint(vec![
            Coord::new(0.0, 0.0, Some(3.0), None),
            Coord::new(1.0, 1.0, Some(-2.0), Some(7.0)),
        ]);
        assert_eq!(Some((-2.0, 3.0)), g.z_range());
        assert_eq!(Some((7.0, 7.0)), g.m_range());
        assert_eq!(None, Geometry::MultiPoint(vec![Coord::xy(0.0, 0.0)]).z_range());
    }

    #[test]
    fn test_display() {
        assert_eq!("POINT EMPTY", format!("{}", Geometry::Point(None)));
        assert_eq!("POINT (1 2)", format!("{}", Geometry::Point(Some(Coord::xy(1.0, 2.0)))));
        assert_eq!("MULTIPOINT (1 2, 3 4 5)", format!("{}", Geometry::MultiPoint(vec![
            Coord::xy(1.0, 2.0),
            Coord::xyz(3.0, 4.0, 5.0),
        ])));
    }
}
