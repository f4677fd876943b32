//! Prints every record of a Shapefile, then a summary.
//!
//! Usage: cat-shp <SHP_PATH> [--skip-invalid]
extern crate shpio;

use std::env;
use std::path::Path;
use std::process;
use shpio::shapefile::{self, GeometryBuilderMode, ReaderOptions, ShapefileError};

fn cat(shp_path: &Path, options: ReaderOptions) -> Result<usize, ShapefileError> {
    let mut reader = shapefile::open(shp_path, options)?;

    eprintln!("{:?} with fields {}", reader.shape_type(), reader.dbf_fields().iter().map(|f| &f.name[..]).collect::<Vec<&str>>().join(", "));
    if let Some(projection) = reader.projection() {
        eprintln!("Projection: {}", projection.trim());
    }

    let mut n_printed = 0;
    while let Some(record) = reader.read_next()? {
        println!("{}", record);
        n_printed += 1;
    }

    for err in reader.errors() {
        eprintln!("Skipped: {}", err);
    }

    Ok(n_printed)
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let skip_invalid = args.len() == 3 && args[2] == "--skip-invalid";
    if args.len() != 2 && !skip_invalid {
        eprintln!("Usage: {} <SHP_PATH> [--skip-invalid]", args[0]);
        process::exit(1);
    }

    let mut options = ReaderOptions::default();
    if skip_invalid {
        options = options.with_geometry_builder_mode(GeometryBuilderMode::SkipInvalidShapes);
    }

    match cat(Path::new(&args[1]), options) {
        Ok(n) => eprintln!("Printed {} records", n),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
