//! `quadkey` and `bbox` commands.

use std::fmt::Write;

use tilescape::coord::{quadkey_to_bounding_box, try_create_quadkey, GeoCoordinate, QuadKey};

use super::validate_lod;
use crate::error::CliError;

pub fn run_quadkey(lat: f64, lon: f64, lod: u8) -> Result<(), CliError> {
    let lod = validate_lod(lod)?;
    let quadkey = try_create_quadkey(GeoCoordinate::new(lat, lon), lod)?;
    print!("{}", describe(&quadkey));
    Ok(())
}

pub fn run_bbox(digits: &str) -> Result<(), CliError> {
    let quadkey: QuadKey = digits.trim().parse()?;
    print!("{}", describe(&quadkey));
    Ok(())
}

/// Multi-line summary of a quadkey and its extent.
pub fn describe(quadkey: &QuadKey) -> String {
    let bbox = quadkey_to_bounding_box(quadkey);
    let mut out = String::new();
    let _ = writeln!(out, "Quadkey:  {}", quadkey);
    let _ = writeln!(
        out,
        "Tile:     x={}, y={}, lod={}",
        quadkey.tile_x, quadkey.tile_y, quadkey.level_of_detail
    );
    let _ = writeln!(out, "South-west: {}", bbox.min_point);
    let _ = writeln!(out, "North-east: {}", bbox.max_point);
    let _ = writeln!(out, "Query:    {}", bbox.to_query());
    out
}
