//! `fetch` command: resolve one tile's map data into the cache.

use std::path::Path;
use std::sync::Arc;

use tilescape::coord::{try_create_quadkey, GeoCoordinate};
use tilescape::pipeline::{ProviderChain, ReqwestNetworkService, TokioFileSystem};
use tilescape::projection::{CartesianProjection, Projection};
use tilescape::tile::{ElementRegistry, Stylesheet, Tile};
use tracing::info;

use super::validate_lod;
use crate::error::CliError;
use crate::runner::CliRunner;

pub fn run(config_path: Option<&Path>, lat: f64, lon: f64, lod: Option<u8>) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("fetch");
    let config = runner.config();

    let lod = validate_lod(lod.unwrap_or(config.tile.level_of_detail))?;
    let coordinate = GeoCoordinate::new(lat, lon);
    let quadkey = try_create_quadkey(coordinate, lod)?;

    let network = Arc::new(ReqwestNetworkService::with_timeout(config.network.timeout_secs)?);
    let providers =
        ProviderChain::from_config(&config.data, &config.cache, network, Arc::new(TokioFileSystem));

    let projection: Arc<dyn Projection> = Arc::new(CartesianProjection::new(coordinate));
    let tile = Tile::new(
        quadkey,
        Stylesheet::new(&config.style.path),
        projection,
        Arc::new(ElementRegistry::new()),
    );

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    let path = runtime.block_on(providers.resolve(&tile))?;

    info!(quadkey = %quadkey, path = %path.display(), "Map data available");
    println!("{}", path.display());
    Ok(())
}
