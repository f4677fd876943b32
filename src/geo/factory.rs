use super::Coord;

/// How decoded ordinates are rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrecisionModel {
    /// Full `f64` precision: ordinates pass through untouched.
    Floating,

    /// Ordinates are rounded to the nearest `1 / scale`.
    Fixed { scale: f64 },
}

impl Default for PrecisionModel {
    fn default() -> PrecisionModel {
        PrecisionModel::Floating
    }
}

impl PrecisionModel {
    pub fn make_precise(&self, value: f64) -> f64 {
        match *self {
            PrecisionModel::Floating => value,
            PrecisionModel::Fixed { scale } => (value * scale).round() / scale,
        }
    }
}

/// Builds the Coords that shape codecs hand back to readers.
///
/// Only X and Y are subject to the precision model; Z and M are stored as
/// read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeometryFactory {
    pub precision_model: PrecisionModel,
}

impl GeometryFactory {
    pub fn new(precision_model: PrecisionModel) -> GeometryFactory {
        GeometryFactory { precision_model: precision_model }
    }

    pub fn fixed(scale: f64) -> GeometryFactory {
        GeometryFactory::new(PrecisionModel::Fixed { scale: scale })
    }

    pub fn coord(&self, x: f64, y: f64, z: Option<f64>, m: Option<f64>) -> Coord {
        Coord {
            x: self.precision_model.make_precise(x),
            y: self.precision_model.make_precise(y),
            z: z,
            m: m,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_floating_is_identity() {
        let factory = GeometryFactory::default();
        assert_eq!(Coord::xy(0.123456789, -9.87654321), factory.coord(0.123456789, -9.87654321, None, None));
    }

    #[test]
    fn test_fixed_rounds_xy_only() {
        let factory = GeometryFactory::fixed(100.0);
        let c = factory.coord(1.23456, 7.891, Some(0.55555), Some(1.11111));
        assert_eq!(1.23, c.x);
        assert_eq!(7.89, c.y);
        assert_eq!(Some(0.55555), c.z);
        assert_eq!(Some(1.11111), c.m);
    }
}
