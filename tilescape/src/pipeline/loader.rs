//! Per-tile load sequence.
//!
//! ```text
//! cancelled? ─► has_data? ──yes──────────────────────────────┐
//!                  │no                                        ▼
//!                  ├─► elevation resolve ─► provider resolve ─► add_to_store ─► load_quadkey
//! ```
//!
//! Network and disk I/O are awaited. The engine calls are blocking and run
//! on the blocking pool.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, instrument, trace};

use super::adapter::{MapData, MapDataAdapter};
use super::elevation::ElevationSource;
use super::engine::{
    ElevationDataType, EngineCallbacks, RawElement, RawMesh, StorageKind, StoreTarget,
};
use super::error::PipelineError;
use super::filesystem::PathResolver;
use super::library::MapDataLibrary;
use super::provider::ProviderChain;
use crate::coord::QuadKey;
use crate::tile::Tile;

/// Outcome of a successful tile load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub quadkey: QuadKey,
    pub meshes: usize,
    pub elements: usize,
    /// Identified meshes already emitted by another tile.
    pub skipped_duplicates: usize,
    /// True when the store already held the tile and nothing was fetched.
    pub from_store: bool,
}

/// Drives a tile through fetch, import and engine load.
pub struct MapDataLoader {
    library: Arc<MapDataLibrary>,
    providers: ProviderChain,
    elevation: Arc<dyn ElevationSource>,
    adapter: MapDataAdapter,
    resolver: Arc<dyn PathResolver>,
}

impl MapDataLoader {
    pub fn new(
        library: Arc<MapDataLibrary>,
        providers: ProviderChain,
        elevation: Arc<dyn ElevationSource>,
        resolver: Arc<dyn PathResolver>,
    ) -> Self {
        Self {
            library,
            providers,
            elevation,
            adapter: MapDataAdapter::new(),
            resolver,
        }
    }

    pub fn library(&self) -> &Arc<MapDataLibrary> {
        &self.library
    }

    pub fn providers(&self) -> &ProviderChain {
        &self.providers
    }

    /// Loads `tile`, sending every adapted mesh and element to `tx` as it
    /// arrives.
    ///
    /// The first engine error ends the load and is returned. Data already
    /// sent stays sent.
    #[instrument(skip_all, fields(quadkey = %tile.quadkey()))]
    pub async fn load(
        &self,
        tile: Arc<Tile>,
        tx: mpsc::UnboundedSender<MapData>,
    ) -> Result<LoadSummary, PipelineError> {
        ensure_live(&tile)?;

        let quadkey = *tile.quadkey();
        let style_path = self.resolver.resolve(tile.stylesheet().path());
        let from_store = self.library.has_data(&quadkey)?;

        if from_store {
            trace!("Tile already in store");
        } else {
            let data_path = self.fetch(&tile).await?;
            ensure_live(&tile)?;
            self.store(&tile, style_path.clone(), data_path).await?;
        }

        ensure_live(&tile)?;
        let mut summary = self.run_engine(tile, style_path, tx).await?;
        summary.from_store = from_store;

        debug!(
            meshes = summary.meshes,
            elements = summary.elements,
            skipped = summary.skipped_duplicates,
            from_store,
            "Tile loaded"
        );
        Ok(summary)
    }

    async fn fetch(&self, tile: &Tile) -> Result<PathBuf, PipelineError> {
        if self.elevation.elevation_type() != ElevationDataType::Flat {
            // The engine opens these itself from the elevation directory
            let files = self.elevation.resolve(tile).await?;
            debug!(quadkey = %tile.quadkey(), files = files.len(), "Elevation data ready");
        }
        self.providers.resolve(tile).await
    }

    async fn store(
        &self,
        tile: &Tile,
        style_path: PathBuf,
        data_path: PathBuf,
    ) -> Result<(), PipelineError> {
        let library = Arc::clone(&self.library);
        let quadkey = *tile.quadkey();

        tokio::task::spawn_blocking(move || {
            library.add_to_store(
                StorageKind::Persistent,
                &style_path,
                &data_path,
                StoreTarget::QuadKey(quadkey),
                &quadkey,
            )
        })
        .await
        .map_err(|e| PipelineError::TaskPanicked(e.to_string()))?
    }

    async fn run_engine(
        &self,
        tile: Arc<Tile>,
        style_path: PathBuf,
        tx: mpsc::UnboundedSender<MapData>,
    ) -> Result<LoadSummary, PipelineError> {
        let library = Arc::clone(&self.library);
        let elevation = self.elevation.elevation_type();
        let adapter = self.adapter;

        tokio::task::spawn_blocking(move || {
            let quadkey = *tile.quadkey();
            let mut collector = Collector::new(tile, adapter, tx);
            library.load_quadkey(&style_path, &quadkey, elevation, &mut collector)?;
            collector.finish()
        })
        .await
        .map_err(|e| PipelineError::TaskPanicked(e.to_string()))?
    }
}

fn ensure_live(tile: &Tile) -> Result<(), PipelineError> {
    if tile.cancellation().is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

/// Engine callback receiver for one load.
struct Collector {
    tile: Arc<Tile>,
    adapter: MapDataAdapter,
    tx: mpsc::UnboundedSender<MapData>,
    summary: LoadSummary,
    error: Option<PipelineError>,
}

impl Collector {
    fn new(tile: Arc<Tile>, adapter: MapDataAdapter, tx: mpsc::UnboundedSender<MapData>) -> Self {
        let summary = LoadSummary {
            quadkey: *tile.quadkey(),
            meshes: 0,
            elements: 0,
            skipped_duplicates: 0,
            from_store: false,
        };
        Self {
            tile,
            adapter,
            tx,
            summary,
            error: None,
        }
    }

    /// True once the load has ended, by error or cancellation.
    fn stopped(&mut self) -> bool {
        if self.error.is_none() && self.tile.cancellation().is_cancelled() {
            self.error = Some(PipelineError::Cancelled);
        }
        self.error.is_some()
    }

    fn send(&mut self, data: MapData) {
        // A dropped receiver means nobody renders this tile any more
        if self.tx.send(data).is_err() {
            self.error = Some(PipelineError::Cancelled);
        }
    }

    fn finish(self) -> Result<LoadSummary, PipelineError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.summary),
        }
    }
}

impl EngineCallbacks for Collector {
    fn on_mesh(&mut self, mesh: RawMesh) {
        if self.stopped() {
            return;
        }
        match self.adapter.adapt_mesh(&self.tile, mesh) {
            Some(mesh) => {
                self.summary.meshes += 1;
                self.send(MapData::Mesh(mesh));
            }
            None => self.summary.skipped_duplicates += 1,
        }
    }

    fn on_element(&mut self, element: RawElement) {
        if self.stopped() {
            return;
        }
        let element = self.adapter.adapt_element(&self.tile, element);
        self.summary.elements += 1;
        self.send(MapData::Element(element));
    }

    fn on_error(&mut self, message: String) {
        if self.stopped() {
            return;
        }
        self.error = Some(self.adapter.adapt_error(&self.tile, &message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use crate::coord::GeoCoordinate;
    use crate::pipeline::elevation::FlatElevation;
    use crate::pipeline::engine::tests::{Emit, StubEngine};
    use crate::pipeline::filesystem::{RootPathResolver, TokioFileSystem};
    use crate::pipeline::network::tests::MockNetwork;
    use crate::pipeline::provider::RemoteDataProvider;
    use crate::projection::{CartesianProjection, Projection};
    use crate::range::Range;
    use crate::tile::{ElementRegistry, Stylesheet};
    use tempfile::TempDir;

    const OSM_URL: &str = "http://osm/{quadkey}";

    fn terrain() -> RawMesh {
        RawMesh {
            name: "terrain".into(),
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            triangles: vec![0, 1, 2],
            colors: vec![0xffffffff; 3],
            uvs: vec![],
        }
    }

    fn building(id: u64) -> RawMesh {
        RawMesh {
            name: format!("building:{}", id),
            ..terrain()
        }
    }

    struct Fixture {
        _dir: TempDir,
        engine: Arc<StubEngine>,
        network: Arc<MockNetwork>,
        loader: MapDataLoader,
    }

    fn fixture(script: Vec<Emit>) -> Fixture {
        fixture_with(script, Arc::new(FlatElevation))
    }

    fn fixture_with(script: Vec<Emit>, elevation: Arc<dyn ElevationSource>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(StubEngine::with_script(script));
        let library = Arc::new(MapDataLibrary::new(engine.clone()));
        library
            .configure(&IndexSettings {
                string_path: dir.path().join("strings"),
                spatial_path: dir.path().join("data"),
            })
            .unwrap();

        let network = Arc::new(MockNetwork::with_response("http://osm/1", b"<osm/>"));
        let provider = RemoteDataProvider::openstreetmap(
            OSM_URL,
            dir.path().join("cache"),
            network.clone(),
            Arc::new(TokioFileSystem),
        );
        let providers = ProviderChain::new().with(Range::new(1, 23), Arc::new(provider));
        let loader = MapDataLoader::new(
            library,
            providers,
            elevation,
            Arc::new(RootPathResolver::new(dir.path())),
        );

        Fixture {
            _dir: dir,
            engine,
            network,
            loader,
        }
    }

    /// SRTM source with a canned answer.
    struct CannedElevation {
        fail: bool,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl CannedElevation {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: Default::default(),
            }
        }
    }

    impl ElevationSource for CannedElevation {
        fn elevation_type(&self) -> ElevationDataType {
            ElevationDataType::Srtm
        }

        fn resolve<'a>(
            &'a self,
            _tile: &'a Tile,
        ) -> futures::future::BoxFuture<'a, Result<Vec<PathBuf>, PipelineError>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let result = if self.fail {
                Err(PipelineError::Network {
                    url: "http://srtm/N00E000.hgt".into(),
                    message: "404".into(),
                })
            } else {
                Ok(vec![PathBuf::from("N00E000.hgt")])
            };
            Box::pin(async move { result })
        }
    }

    fn tile(registry: &Arc<ElementRegistry>) -> Arc<Tile> {
        let projection: Arc<dyn Projection> =
            Arc::new(CartesianProjection::new(GeoCoordinate::new(0.0, 0.0)));
        Arc::new(Tile::new(
            QuadKey::new(1, 0, 1),
            Stylesheet::new("default.mapcss"),
            projection,
            Arc::clone(registry),
        ))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<MapData>) -> Vec<MapData> {
        let mut out = Vec::new();
        while let Ok(data) = rx.try_recv() {
            out.push(data);
        }
        out
    }

    #[tokio::test]
    async fn test_load_fetches_stores_and_emits() {
        let f = fixture(vec![Emit::Mesh(terrain()), Emit::Mesh(building(7))]);
        let registry = Arc::new(ElementRegistry::new());
        let tile = tile(&registry);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let summary = f.loader.load(Arc::clone(&tile), tx).await.unwrap();

        assert_eq!(summary.meshes, 2);
        assert!(!summary.from_store);
        assert_eq!(f.network.request_count(), 1);
        assert_eq!(
            f.engine.stored.lock().unwrap()[0].1,
            StoreTarget::QuadKey(QuadKey::new(1, 0, 1))
        );
        assert_eq!(drain(&mut rx).len(), 2);
        assert!(registry.contains(7));
    }

    #[tokio::test]
    async fn test_elevation_resolves_before_map_data() {
        let elevation = Arc::new(CannedElevation::new(false));
        let f = fixture_with(vec![Emit::Mesh(terrain())], elevation.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        f.loader.load(tile(&Arc::new(ElementRegistry::new())), tx).await.unwrap();

        assert_eq!(elevation.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(
            f.engine.loads.lock().unwrap()[0],
            (QuadKey::new(1, 0, 1), ElevationDataType::Srtm)
        );
    }

    #[tokio::test]
    async fn test_elevation_failure_fails_tile() {
        let f = fixture_with(vec![Emit::Mesh(terrain())], Arc::new(CannedElevation::new(true)));
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = f
            .loader
            .load(tile(&Arc::new(ElementRegistry::new())), tx)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Network { .. }));
        assert_eq!(f.network.request_count(), 0);
        assert!(f.engine.loads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_load_comes_from_store() {
        let f = fixture(vec![Emit::Mesh(terrain())]);
        let registry = Arc::new(ElementRegistry::new());
        let (tx, _rx) = mpsc::unbounded_channel();

        f.loader.load(tile(&registry), tx.clone()).await.unwrap();
        let summary = f.loader.load(tile(&registry), tx).await.unwrap();

        assert!(summary.from_store);
        assert_eq!(f.network.request_count(), 1);
        assert_eq!(f.engine.stored.lock().unwrap().len(), 1);
        assert_eq!(f.engine.loads.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_first_error_ends_load() {
        let f = fixture(vec![
            Emit::Mesh(terrain()),
            Emit::Error("style failed".into()),
            Emit::Mesh(building(1)),
            Emit::Error("second".into()),
        ]);
        let registry = Arc::new(ElementRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let err = f.loader.load(tile(&registry), tx).await.unwrap_err();

        match err {
            PipelineError::Engine { message, .. } => assert_eq!(message, "style failed"),
            other => panic!("expected Engine error, got {:?}", other),
        }
        assert_eq!(drain(&mut rx).len(), 1);
        assert!(!registry.contains(1));
    }

    #[tokio::test]
    async fn test_duplicates_are_counted() {
        let f = fixture(vec![Emit::Mesh(building(5)), Emit::Mesh(building(5))]);
        let registry = Arc::new(ElementRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let summary = f.loader.load(tile(&registry), tx).await.unwrap();

        assert_eq!(summary.meshes, 1);
        assert_eq!(summary.skipped_duplicates, 1);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_tile_is_not_loaded() {
        let f = fixture(vec![Emit::Mesh(terrain())]);
        let registry = Arc::new(ElementRegistry::new());
        let tile = tile(&registry);
        tile.dispose();
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = f.loader.load(tile, tx).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(f.network.request_count(), 0);
        assert!(f.engine.loads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_error_fails_tile() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(StubEngine {
            store_error: Some("bad style".into()),
            ..Default::default()
        });
        let library = Arc::new(MapDataLibrary::new(engine.clone()));
        library
            .configure(&IndexSettings {
                string_path: dir.path().join("s"),
                spatial_path: dir.path().join("d"),
            })
            .unwrap();
        let network = Arc::new(MockNetwork::with_response("http://osm/1", b"<osm/>"));
        let provider = RemoteDataProvider::openstreetmap(
            OSM_URL,
            dir.path().join("cache"),
            network,
            Arc::new(TokioFileSystem),
        );
        let loader = MapDataLoader::new(
            library,
            ProviderChain::new().with(Range::new(1, 23), Arc::new(provider)),
            Arc::new(FlatElevation),
            Arc::new(RootPathResolver::new(dir.path())),
        );
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = loader
            .load(tile(&Arc::new(ElementRegistry::new())), tx)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Store { .. }));
        assert!(engine.loads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_library() {
        let engine = Arc::new(StubEngine::default());
        let loader = MapDataLoader::new(
            Arc::new(MapDataLibrary::new(engine)),
            ProviderChain::new(),
            Arc::new(FlatElevation),
            Arc::new(RootPathResolver::new("/")),
        );
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = loader
            .load(tile(&Arc::new(ElementRegistry::new())), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotConfigured));
    }
}
