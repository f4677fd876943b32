use std::fmt;
use encoding::EncodingRef;

use crate::geo::{Envelope, GeometryFactory};

/// How the spatial filter compares a record against the filter envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialFilterMode {
    /// Keep records whose bounding box intersects the envelope. Cheap: for
    /// multi-part shapes the box is checked before coordinates are parsed.
    FilterByExtent,

    /// Keep records whose geometry intersects the envelope. The bounding box
    /// test still runs first; survivors are then tested exactly.
    FilterByGeometry,
}

impl Default for SpatialFilterMode {
    fn default() -> SpatialFilterMode {
        SpatialFilterMode::FilterByExtent
    }
}

/// What the reader does with a record whose geometry is structurally invalid
/// (an unclosed ring, a one-point line, a hole outside every shell, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryBuilderMode {
    /// Fail the read.
    Strict,

    /// Repair what can be repaired: close rings, pad short rings and lines,
    /// turn orphan holes into shells.
    FixInvalidShapes,

    /// Build the geometry exactly as stored, even when it is invalid.
    IgnoreInvalidShapes,

    /// Log the record in `errors()` and move on to the next one.
    SkipInvalidShapes,
}

impl Default for GeometryBuilderMode {
    fn default() -> GeometryBuilderMode {
        GeometryBuilderMode::Strict
    }
}

/// Everything a reader is configured with. Read once, at construction.
#[derive(Clone, Default)]
pub struct ReaderOptions {
    pub spatial_filter_envelope: Option<Envelope>,
    pub spatial_filter_mode: SpatialFilterMode,
    pub geometry_builder_mode: GeometryBuilderMode,

    /// Stop after this many records. A ".shp" reader paired with a ".dbf"
    /// gets the ".dbf" row count here.
    pub attribute_row_count_ceiling: Option<usize>,

    pub geometry_factory: GeometryFactory,

    /// ".dbf" text encoding. None means "ask the ".cpg" file, then the ".dbf"
    /// header, then assume UTF-8".
    pub encoding: Option<EncodingRef>,
}

// encoding::EncodingRef does not implement std::fmt::Debug
impl fmt::Debug for ReaderOptions {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("ReaderOptions")
            .field("spatial_filter_envelope", &self.spatial_filter_envelope)
            .field("spatial_filter_mode", &self.spatial_filter_mode)
            .field("geometry_builder_mode", &self.geometry_builder_mode)
            .field("attribute_row_count_ceiling", &self.attribute_row_count_ceiling)
            .field("geometry_factory", &self.geometry_factory)
            .field("encoding", &self.encoding.map(|e| e.name()))
            .finish()
    }
}

impl ReaderOptions {
    pub fn with_spatial_filter(mut self, envelope: Envelope, mode: SpatialFilterMode) -> ReaderOptions {
        self.spatial_filter_envelope = Some(envelope);
        self.spatial_filter_mode = mode;
        self
    }

    pub fn with_geometry_builder_mode(mut self, mode: GeometryBuilderMode) -> ReaderOptions {
        self.geometry_builder_mode = mode;
        self
    }

    pub fn with_attribute_row_count_ceiling(mut self, n_rows: usize) -> ReaderOptions {
        self.attribute_row_count_ceiling = Some(n_rows);
        self
    }

    pub fn with_geometry_factory(mut self, factory: GeometryFactory) -> ReaderOptions {
        self.geometry_factory = factory;
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingRef) -> ReaderOptions {
        self.encoding = Some(encoding);
        self
    }
}
