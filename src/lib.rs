//! Reads and writes ESRI Shapefiles: ".shp" geometries, their ".shx" index
//! and their ".dbf" attribute tables.
extern crate byteorder;
extern crate chrono;
extern crate encoding;
extern crate itertools;
#[macro_use] extern crate lazy_static;
#[macro_use] extern crate log;
extern crate regex;
extern crate thiserror;

pub mod geo;
pub mod shapefile;
