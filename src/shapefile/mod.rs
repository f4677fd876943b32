//! Reads and writes ".shp" files and their accompanying ".shx", ".dbf",
//! ".cpg" and ".prj" files.
//!
//! A few things ".shp" and ".dbf" files _don't_ tell us:
//!
//! * The _projection_ isn't specified. Sometimes there's a ".prj" file that
//!   contains that information, but no file format can represent all the
//!   projections out there in the world. This library hands back the ".prj"
//!   text as-is and returns `f64` coordinates.
//! * The ".dbf" text encoding is often unspecified. We look for a ".cpg" file,
//!   then the ".dbf" header's language driver id; failing both, we assume
//!   UTF-8. `ReaderOptions::with_encoding()` overrides all that.
//!
//! # Examples
//!
//! Open by ".shp" filename:
//!
//! ```no_run
//! use std::path::Path;
//! use shpio::shapefile;
//!
//! let reader = shapefile::open_utf8(Path::new("states.shp")).unwrap();
//!
//! for record in reader {
//!     // record is a Result<ShapefileRecord, ShapefileError>
//!     println!("{}", record.unwrap());
//! }
//! ```
//!
//! Read only what's in a bounding box, skipping (and logging) invalid
//! polygons:
//!
//! ```no_run
//! use std::path::Path;
//! use shpio::geo::Envelope;
//! use shpio::shapefile::{self, GeometryBuilderMode, ReaderOptions, SpatialFilterMode};
//!
//! let options = ReaderOptions::default()
//!     .with_spatial_filter(Envelope::new(-80.0, 40.0, -70.0, 50.0), SpatialFilterMode::FilterByGeometry)
//!     .with_geometry_builder_mode(GeometryBuilderMode::SkipInvalidShapes);
//! let mut reader = shapefile::open(Path::new("states.shp"), options).unwrap();
//!
//! while let Some(record) = reader.read_next().unwrap() {
//!     println!("{}", record);
//! }
//!
//! for err in reader.errors() {
//!     eprintln!("skipped: {}", err);
//! }
//! ```
use std::fs;
use std::io;
use std::path::Path;
use encoding;

mod layout;
mod options;
mod shapefile;

pub mod dbf;
pub mod shp;

pub use self::options::{GeometryBuilderMode, ReaderOptions, SpatialFilterMode};
pub use self::shapefile::{create, encoding_from_cpg, open, ShapefileError, ShapefileReader, ShapefileRecord, ShapefileWriter};

pub fn open_utf8(shp_path: &Path) -> Result<ShapefileReader<io::BufReader<fs::File>, io::BufReader<fs::File>>, ShapefileError> {
    open(shp_path, ReaderOptions::default().with_encoding(encoding::all::UTF_8))
}

pub fn open_windows1252(shp_path: &Path) -> Result<ShapefileReader<io::BufReader<fs::File>, io::BufReader<fs::File>>, ShapefileError> {
    open(shp_path, ReaderOptions::default().with_encoding(encoding::all::WINDOWS_1252))
}
