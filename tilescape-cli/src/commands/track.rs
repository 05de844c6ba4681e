//! `track` command: replay a straight path through a tile controller.
//!
//! Positions are interpolated linearly in latitude and longitude, which is
//! close enough to a great circle over the distances a controller cares
//! about.

use std::path::Path;
use std::sync::Arc;

use tilescape::config::ConfigFile;
use tilescape::controller::{ControllerConfig, LodSelector, PositionUpdate, TileController};
use tilescape::coord::GeoCoordinate;
use tilescape::projection::{CartesianProjection, Projection};
use tilescape::tile::Stylesheet;
use tracing::info;

use super::validate_lod;
use crate::error::CliError;
use crate::runner::CliRunner;

pub struct TrackArgs {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub steps: u32,
    pub lod: Option<u8>,
    /// Observer altitude; picks the level of detail when `lod` is unset.
    pub altitude: Option<f64>,
}

pub fn run(config_path: Option<&Path>, args: TrackArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("track");

    let controller = Arc::new(controller_for(runner.config(), &args));
    let state = Arc::clone(&controller);
    tilescape::panic::set_state_callback(move || panic_state(&state));

    let lod = select_lod(runner.config(), &args)?;
    let path = interpolate(&args)?;

    let mut evaluated = 0usize;
    for (step, position) in path.iter().enumerate() {
        let update = controller.on_geo_position(*position, lod)?;
        if !update.skipped {
            evaluated += 1;
        }
        if let Some(line) = format_update(step, position, &update) {
            println!("{}", line);
        }
    }

    tilescape::panic::clear_state_callback();
    info!(
        steps = path.len(),
        evaluated,
        loaded = controller.loaded_count(),
        "Track replay finished"
    );
    println!(
        "{} positions, {} evaluated, {} tiles loaded at the end",
        path.len(),
        evaluated,
        controller.loaded_count()
    );
    Ok(())
}

fn controller_for(config: &ConfigFile, args: &TrackArgs) -> TileController {
    let origin = GeoCoordinate::new(args.from.0, args.from.1);
    let projection: Arc<dyn Projection> = Arc::new(CartesianProjection::new(origin));
    TileController::new(
        ControllerConfig::from_config(config),
        projection,
        Stylesheet::new(&config.style.path),
    )
}

/// Explicit `--lod`, else the altitude bucket, else `tile.level_of_detail`.
fn select_lod(config: &ConfigFile, args: &TrackArgs) -> Result<u8, CliError> {
    let fallback = config.tile.level_of_detail;
    match (args.lod, args.altitude) {
        (Some(lod), _) => validate_lod(lod),
        (None, Some(altitude)) => {
            let lod = LodSelector::with_defaults(fallback)?.select(altitude);
            info!(altitude, lod, "Level of detail from altitude");
            validate_lod(lod)
        }
        (None, None) => validate_lod(fallback),
    }
}

/// Runs inside the panic hook, possibly while this thread holds the
/// controller lock.
fn panic_state(controller: &TileController) -> String {
    match controller.try_snapshot() {
        Some((loaded, current)) => format!(
            "{} tiles loaded, current {:?}",
            loaded,
            current.map(|q| q.to_string())
        ),
        None => "tile controller busy".to_string(),
    }
}

/// `steps + 1` evenly spaced positions from `from` to `to` inclusive.
fn interpolate(args: &TrackArgs) -> Result<Vec<GeoCoordinate>, CliError> {
    if args.steps == 0 {
        return Err(CliError::InvalidArgument("steps must be positive".into()));
    }
    let (from_lat, from_lon) = args.from;
    let (to_lat, to_lon) = args.to;
    Ok((0..=args.steps)
        .map(|i| {
            let t = f64::from(i) / f64::from(args.steps);
            GeoCoordinate::new(
                from_lat + (to_lat - from_lat) * t,
                from_lon + (to_lon - from_lon) * t,
            )
        })
        .collect())
}

fn format_update(step: usize, position: &GeoCoordinate, update: &PositionUpdate) -> Option<String> {
    if update.is_empty() {
        return None;
    }
    let join = |keys: &[tilescape::coord::QuadKey]| {
        keys.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(" ")
    };
    let mut line = format!("[{:>4}] {}", step, position);
    if !update.loaded.is_empty() {
        line.push_str(&format!("  +{}", join(&update.loaded)));
    }
    if !update.unloaded.is_empty() {
        line.push_str(&format!("  -{}", join(&update.unloaded)));
    }
    Some(line)
}
