//! Elevation data resolution.
//!
//! SRTM data comes in one-degree cells named after their south-west corner
//! (`N52E013.hgt`). Grid data is one `<quadkey>.ele` file per tile. Both are
//! cached under the elevation directory with the same cache-or-fetch rules
//! as map data.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use super::engine::ElevationDataType;
use super::error::PipelineError;
use super::filesystem::FileSystem;
use super::network::NetworkService;
use super::provider::{expand_url, CachedFetcher};
use crate::config::ElevationSettings;
use crate::coord::BoundingBox;
use crate::tile::Tile;

/// Makes the elevation files for a tile available locally.
pub trait ElevationSource: Send + Sync {
    fn elevation_type(&self) -> ElevationDataType;

    /// Local files the engine needs for `tile`. Empty for flat terrain.
    fn resolve<'a>(&'a self, tile: &'a Tile) -> BoxFuture<'a, Result<Vec<PathBuf>, PipelineError>>;
}

/// Flat terrain, nothing to resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatElevation;

impl ElevationSource for FlatElevation {
    fn elevation_type(&self) -> ElevationDataType {
        ElevationDataType::Flat
    }

    fn resolve<'a>(&'a self, _tile: &'a Tile) -> BoxFuture<'a, Result<Vec<PathBuf>, PipelineError>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// Name of the SRTM cell whose south-west corner is at the given integer
/// latitude and longitude, e.g. `N52E013` or `S34W071`.
pub fn srtm_cell_name(latitude: i32, longitude: i32) -> String {
    let ns = if latitude >= 0 { 'N' } else { 'S' };
    let ew = if longitude >= 0 { 'E' } else { 'W' };
    format!(
        "{}{:02}{}{:03}",
        ns,
        latitude.unsigned_abs(),
        ew,
        longitude.unsigned_abs()
    )
}

/// Every SRTM cell overlapping `bbox`, south to north then west to east.
pub fn srtm_cells(bbox: &BoundingBox) -> Vec<String> {
    if bbox.is_empty() {
        return Vec::new();
    }

    let span = |min: f64, max: f64| {
        let first = min.floor() as i32;
        // A box ending exactly on a cell edge does not reach the next cell
        let last = (max.ceil() as i32 - 1).max(first);
        first..=last
    };

    let mut cells = Vec::new();
    for lat in span(bbox.min_point.latitude, bbox.max_point.latitude) {
        for lon in span(bbox.min_point.longitude, bbox.max_point.longitude) {
            cells.push(srtm_cell_name(lat, lon));
        }
    }
    cells
}

/// Elevation source selected by `elevation.type`.
///
/// Grid elevation has no default source, so `elevation.grid_url` must be set.
pub fn elevation_from_config<N, F>(
    settings: &ElevationSettings,
    network: Arc<N>,
    fs: Arc<F>,
) -> Result<Arc<dyn ElevationSource>, PipelineError>
where
    N: NetworkService + 'static,
    F: FileSystem + 'static,
{
    let source: Arc<dyn ElevationSource> = match settings.elevation_type {
        ElevationDataType::Flat => Arc::new(FlatElevation),
        ElevationDataType::Srtm => Arc::new(ElevationProvider::srtm(
            &settings.srtm_url,
            &settings.directory,
            network,
            fs,
        )),
        ElevationDataType::Grid => {
            let url = settings.grid_url.as_ref().ok_or_else(|| {
                PipelineError::Config("elevation.grid_url must be set for grid elevation".into())
            })?;
            Arc::new(ElevationProvider::grid(url, &settings.directory, network, fs))
        }
    };
    Ok(source)
}

/// Remote SRTM or grid elevation with a local cache.
pub struct ElevationProvider<N, F> {
    kind: ElevationDataType,
    directory: PathBuf,
    url_template: String,
    fetcher: CachedFetcher<N, F>,
}

impl<N: NetworkService, F: FileSystem> ElevationProvider<N, F> {
    /// SRTM cells fetched from a `{cell}` template.
    pub fn srtm(
        url_template: impl Into<String>,
        directory: impl Into<PathBuf>,
        network: Arc<N>,
        fs: Arc<F>,
    ) -> Self {
        Self {
            kind: ElevationDataType::Srtm,
            directory: directory.into(),
            url_template: url_template.into(),
            fetcher: CachedFetcher::new(network, fs),
        }
    }

    /// Per-quadkey grids fetched from a `{quadkey}` template.
    pub fn grid(
        url_template: impl Into<String>,
        directory: impl Into<PathBuf>,
        network: Arc<N>,
        fs: Arc<F>,
    ) -> Self {
        Self {
            kind: ElevationDataType::Grid,
            directory: directory.into(),
            url_template: url_template.into(),
            fetcher: CachedFetcher::new(network, fs),
        }
    }

    /// Files and their download URLs for `tile`.
    fn targets(&self, tile: &Tile) -> Vec<(PathBuf, String)> {
        match self.kind {
            ElevationDataType::Flat => Vec::new(),
            ElevationDataType::Srtm => srtm_cells(tile.bounding_box())
                .into_iter()
                .map(|cell| {
                    let path = self.directory.join(format!("{}.hgt", cell));
                    let url = self.url_template.replace("{cell}", &cell);
                    (path, url)
                })
                .collect(),
            ElevationDataType::Grid => {
                let path = self.directory.join(format!("{}.ele", tile.quadkey()));
                vec![(path, expand_url(&self.url_template, tile, None))]
            }
        }
    }
}

impl<N: NetworkService, F: FileSystem> ElevationSource for ElevationProvider<N, F> {
    fn elevation_type(&self) -> ElevationDataType {
        self.kind
    }

    fn resolve<'a>(&'a self, tile: &'a Tile) -> BoxFuture<'a, Result<Vec<PathBuf>, PipelineError>> {
        Box::pin(async move {
            let mut paths = Vec::new();
            for (path, url) in self.targets(tile) {
                self.fetcher
                    .fetch_to(&path, &url, tile.cancellation())
                    .await?;
                paths.push(path);
            }
            debug!(
                quadkey = %tile.quadkey(),
                kind = %self.kind,
                files = paths.len(),
                "Elevation data resolved"
            );
            Ok(paths)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{create_quadkey, GeoCoordinate, QuadKey};
    use crate::pipeline::filesystem::TokioFileSystem;
    use crate::pipeline::network::tests::MockNetwork;
    use crate::projection::{CartesianProjection, Projection};
    use crate::tile::{ElementRegistry, Stylesheet};
    use tempfile::TempDir;

    fn tile(quadkey: QuadKey) -> Tile {
        let projection: Arc<dyn Projection> =
            Arc::new(CartesianProjection::new(GeoCoordinate::new(52.5, 13.4)));
        Tile::new(
            quadkey,
            Stylesheet::new("default.mapcss"),
            projection,
            Arc::new(ElementRegistry::new()),
        )
    }

    #[test]
    fn test_srtm_cell_name() {
        assert_eq!(srtm_cell_name(52, 13), "N52E013");
        assert_eq!(srtm_cell_name(-34, -71), "S34W071");
        assert_eq!(srtm_cell_name(0, 0), "N00E000");
        assert_eq!(srtm_cell_name(-1, -1), "S01W001");
        assert_eq!(srtm_cell_name(5, -120), "N05W120");
    }

    #[test]
    fn test_srtm_cells_for_small_box() {
        let bbox = BoundingBox::new(
            GeoCoordinate::new(52.51, 13.38),
            GeoCoordinate::new(52.53, 13.40),
        );
        assert_eq!(srtm_cells(&bbox), vec!["N52E013"]);
    }

    #[test]
    fn test_srtm_cells_spanning_edges() {
        let bbox = BoundingBox::new(
            GeoCoordinate::new(-0.5, 179.5),
            GeoCoordinate::new(0.5, 179.9),
        );
        assert_eq!(srtm_cells(&bbox), vec!["S01E179", "N00E179"]);

        // Ending exactly on a cell edge stays in the lower cell
        let bbox = BoundingBox::new(
            GeoCoordinate::new(10.2, 20.0),
            GeoCoordinate::new(11.0, 20.5),
        );
        assert_eq!(srtm_cells(&bbox), vec!["N10E020"]);

        assert!(srtm_cells(&BoundingBox::empty()).is_empty());
    }

    #[tokio::test]
    async fn test_flat_resolves_nothing() {
        let tile = tile(QuadKey::new(1, 0, 1));
        assert!(FlatElevation.resolve(&tile).await.unwrap().is_empty());
        assert_eq!(FlatElevation.elevation_type(), ElevationDataType::Flat);
    }

    #[tokio::test]
    async fn test_srtm_fetches_cell() {
        let dir = TempDir::new().unwrap();
        let network = Arc::new(MockNetwork::with_response(
            "http://srtm/N52E013.hgt",
            b"hgt",
        ));
        let provider = ElevationProvider::srtm(
            "http://srtm/{cell}.hgt",
            dir.path(),
            network.clone(),
            Arc::new(TokioFileSystem),
        );
        let berlin = tile(create_quadkey(GeoCoordinate::new(52.52, 13.39), 16));

        let paths = provider.resolve(&berlin).await.unwrap();
        assert_eq!(paths, vec![dir.path().join("N52E013.hgt")]);
        assert_eq!(std::fs::read(&paths[0]).unwrap(), b"hgt");

        // Second tile in the same cell is served from the cache
        let neighbour = tile(create_quadkey(GeoCoordinate::new(52.53, 13.40), 16));
        provider.resolve(&neighbour).await.unwrap();
        assert_eq!(network.request_count(), 1);
    }

    #[tokio::test]
    async fn test_grid_uses_quadkey_file() {
        let dir = TempDir::new().unwrap();
        let tile = tile(QuadKey::new(3, 5, 3));
        let network = Arc::new(MockNetwork::with_response("http://grid/213", b"ele"));
        let provider = ElevationProvider::grid(
            "http://grid/{quadkey}",
            dir.path(),
            network,
            Arc::new(TokioFileSystem),
        );

        let paths = provider.resolve(&tile).await.unwrap();
        assert_eq!(paths, vec![dir.path().join("213.ele")]);
        assert_eq!(provider.elevation_type(), ElevationDataType::Grid);
    }

    #[test]
    fn test_from_config_selects_source() {
        let network = Arc::new(MockNetwork::default());
        let fs = Arc::new(TokioFileSystem);
        let mut settings = crate::config::ConfigFile::default().elevation;

        let flat = elevation_from_config(&settings, network.clone(), fs.clone()).unwrap();
        assert_eq!(flat.elevation_type(), ElevationDataType::Flat);

        settings.elevation_type = ElevationDataType::Srtm;
        let srtm = elevation_from_config(&settings, network.clone(), fs.clone()).unwrap();
        assert_eq!(srtm.elevation_type(), ElevationDataType::Srtm);

        settings.elevation_type = ElevationDataType::Grid;
        settings.grid_url = None;
        assert!(matches!(
            elevation_from_config(&settings, network.clone(), fs.clone()),
            Err(PipelineError::Config(_))
        ));

        settings.grid_url = Some("http://grid/{quadkey}".into());
        let grid = elevation_from_config(&settings, network, fs).unwrap();
        assert_eq!(grid.elevation_type(), ElevationDataType::Grid);
    }
}
