//! Connects controller events to the pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::render::RenderCommand;
use crate::controller::{TileController, TileEvent};
use crate::coord::QuadKey;
use crate::pipeline::{MapData, MapDataLoader};
use crate::tile::Tile;

/// Streams tile data to the render thread as the controller loads and
/// unloads tiles.
///
/// # Lifecycle
///
/// 1. **Start**: [`TileStreamer::start`] subscribes to the controller and
///    spawns the event loop. Every `Loaded` tile gets its own load task.
/// 2. **Operation**: the render thread drains the returned receiver.
/// 3. **Shutdown**: [`TileStreamer::shutdown`] stops the loop and aborts
///    in-flight loads.
pub struct TileStreamer {
    controller: Arc<TileController>,
    handle: Option<JoinHandle<()>>,
    shutdown_token: CancellationToken,
}

impl TileStreamer {
    /// Starts streaming. Must be called inside a tokio runtime.
    pub fn start(
        controller: Arc<TileController>,
        loader: Arc<MapDataLoader>,
    ) -> (Self, mpsc::UnboundedReceiver<RenderCommand>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let shutdown_token = CancellationToken::new();

        // Subscribe before spawning so no event emitted after start is missed
        let events = controller.subscribe();
        let event_loop = EventLoop {
            controller: Arc::clone(&controller),
            loader,
            commands,
            active: HashMap::new(),
            tasks: JoinSet::new(),
        };
        let handle = tokio::spawn(event_loop.run(events, shutdown_token.clone()));

        info!("Tile streamer started");
        (
            Self {
                controller,
                handle: Some(handle),
                shutdown_token,
            },
            rx,
        )
    }

    pub fn controller(&self) -> &Arc<TileController> {
        &self.controller
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the event loop and waits for it.
    pub async fn shutdown(mut self) {
        info!("Shutting down tile streamer");
        self.shutdown_token.cancel();

        if let Some(handle) = self.handle.take() {
            match handle.await {
                Ok(()) => info!("Tile streamer stopped"),
                Err(e) => error!(error = %e, "Tile streamer task panicked"),
            }
        }
    }
}

impl Drop for TileStreamer {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

enum Step {
    Shutdown,
    Event(Result<TileEvent, broadcast::error::RecvError>),
    Finished(Result<(), JoinError>),
}

struct EventLoop {
    controller: Arc<TileController>,
    loader: Arc<MapDataLoader>,
    commands: mpsc::UnboundedSender<RenderCommand>,
    /// Tiles activated on the render side and not yet deactivated.
    active: HashMap<QuadKey, Arc<Tile>>,
    tasks: JoinSet<()>,
}

impl EventLoop {
    async fn run(mut self, mut events: broadcast::Receiver<TileEvent>, shutdown: CancellationToken) {
        debug!("Tile streamer waiting for controller events");

        // Tiles loaded before the subscription
        self.resync();

        loop {
            let step = tokio::select! {
                _ = shutdown.cancelled() => Step::Shutdown,
                result = events.recv() => Step::Event(result),
                Some(result) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    Step::Finished(result)
                }
            };

            match step {
                Step::Shutdown => break,
                Step::Event(Ok(TileEvent::Loaded(tile))) => self.activate(tile),
                Step::Event(Ok(TileEvent::Unloaded(tile))) => self.deactivate(&tile),
                Step::Event(Err(broadcast::error::RecvError::Lagged(n))) => {
                    warn!(skipped = n, "Tile streamer lagged behind controller events");
                    self.resync();
                }
                Step::Event(Err(broadcast::error::RecvError::Closed)) => {
                    debug!("Controller event channel closed");
                    break;
                }
                Step::Finished(result) => log_task_result(result),
            }
        }

        self.tasks.abort_all();
        while let Some(result) = self.tasks.join_next().await {
            log_task_result(result);
        }
        debug!("Tile streamer event loop stopped");
    }

    /// Brings the active set in line with the controller after missed events.
    fn resync(&mut self) {
        let loaded = self.controller.loaded_tiles();

        let gone: Vec<Arc<Tile>> = self
            .active
            .values()
            .filter(|tile| tile.is_disposed())
            .cloned()
            .collect();
        for tile in gone {
            self.deactivate(&tile);
        }

        for tile in loaded {
            let known = self
                .active
                .get(tile.quadkey())
                .is_some_and(|active| Arc::ptr_eq(active, &tile));
            if !known {
                self.activate(tile);
            }
        }
    }

    fn activate(&mut self, tile: Arc<Tile>) {
        if tile.is_disposed() {
            return;
        }
        if let Some(previous) = self.active.insert(*tile.quadkey(), Arc::clone(&tile)) {
            if Arc::ptr_eq(&previous, &tile) {
                return;
            }
            // A reload of the same key supersedes a missed unload
            previous.cancellation().cancel();
            let _ = self.commands.send(RenderCommand::Deactivate(previous));
        }

        let _ = self.commands.send(RenderCommand::Activate(Arc::clone(&tile)));
        self.tasks.spawn(load_tile(
            Arc::clone(&self.loader),
            Arc::clone(&self.controller),
            tile,
            self.commands.clone(),
        ));
    }

    fn deactivate(&mut self, tile: &Arc<Tile>) {
        tile.cancellation().cancel();
        let matches = self
            .active
            .get(tile.quadkey())
            .is_some_and(|active| Arc::ptr_eq(active, tile));
        if matches {
            self.active.remove(tile.quadkey());
            let _ = self.commands.send(RenderCommand::Deactivate(Arc::clone(tile)));
        }
    }
}

/// Runs one tile through the pipeline and forwards its data.
async fn load_tile(
    loader: Arc<MapDataLoader>,
    controller: Arc<TileController>,
    tile: Arc<Tile>,
    commands: mpsc::UnboundedSender<RenderCommand>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<MapData>();

    let forward = async {
        while let Some(data) = rx.recv().await {
            let _ = commands.send(RenderCommand::Data {
                tile: Arc::clone(&tile),
                data,
            });
        }
    };
    let (result, ()) = tokio::join!(loader.load(Arc::clone(&tile), tx), forward);

    match result {
        Ok(summary) => {
            let _ = commands.send(RenderCommand::Completed { tile, summary });
        }
        Err(e) if e.is_cancelled() || tile.is_disposed() => {
            debug!(quadkey = %tile.quadkey(), "Tile load cancelled");
        }
        Err(e) => {
            warn!(quadkey = %tile.quadkey(), error = %e, "Tile load failed");
            let quadkey = *tile.quadkey();
            let _ = commands.send(RenderCommand::Failed { quadkey, error: e });
            controller.on_load_failed(&tile);
        }
    }
}

fn log_task_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(error = %e, "Tile load task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use crate::controller::ControllerConfig;
    use crate::coord::{create_quadkey, quadkey_to_bounding_box, GeoCoordinate};
    use crate::pipeline::{
        ElevationDataType, EngineCallbacks, EngineError, FlatElevation, MapDataLibrary,
        MapDataProvider, PipelineError, ProviderChain, RawMesh, RootPathResolver, SpatialEngine,
        StorageKind, StoreTarget,
    };
    use crate::projection::{CartesianProjection, Projection};
    use crate::range::Range;
    use crate::tile::Stylesheet;
    use futures::future::BoxFuture;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Emits one terrain mesh per load, or fails every load.
    struct TerrainEngine {
        fail: bool,
    }

    impl SpatialEngine for TerrainEngine {
        fn configure(&self, _: &Path, _: &Path) -> Result<(), EngineError> {
            Ok(())
        }

        fn has_data(&self, _quadkey: &QuadKey) -> bool {
            true
        }

        fn add_to_store(
            &self,
            _: StorageKind,
            _: &Path,
            _: &Path,
            _: StoreTarget,
        ) -> Result<(), EngineError> {
            Ok(())
        }

        fn load_quadkey(
            &self,
            _style: &Path,
            _quadkey: &QuadKey,
            _elevation: ElevationDataType,
            callbacks: &mut dyn EngineCallbacks,
        ) {
            if self.fail {
                callbacks.on_error("corrupt index".to_string());
                return;
            }
            callbacks.on_mesh(RawMesh {
                name: "terrain".into(),
                vertices: vec![13.4, 52.5, 0.0, 13.41, 52.5, 0.0, 13.41, 52.51, 0.0],
                triangles: vec![0, 1, 2],
                colors: vec![0xffffffff; 3],
                uvs: vec![],
            });
        }
    }

    struct NoProvider;

    impl MapDataProvider for NoProvider {
        fn name(&self) -> &str {
            "none"
        }

        fn resolve<'a>(&'a self, _tile: &'a Tile) -> BoxFuture<'a, Result<PathBuf, PipelineError>> {
            Box::pin(async { Err(PipelineError::NoProvider(0)) })
        }
    }

    fn setup(dir: &TempDir, fail: bool) -> (Arc<TileController>, Arc<MapDataLoader>) {
        let library = Arc::new(MapDataLibrary::new(Arc::new(TerrainEngine { fail })));
        library
            .configure(&IndexSettings {
                string_path: dir.path().join("strings"),
                spatial_path: dir.path().join("data"),
            })
            .unwrap();
        let loader = MapDataLoader::new(
            library,
            ProviderChain::new().with(Range::new(1, 23), Arc::new(NoProvider)),
            Arc::new(FlatElevation),
            Arc::new(RootPathResolver::new(dir.path())),
        );
        let projection: Arc<dyn Projection> =
            Arc::new(CartesianProjection::new(GeoCoordinate::new(52.5, 13.4)));
        let controller = TileController::new(
            ControllerConfig::default(),
            projection,
            Stylesheet::new("default.mapcss"),
        );
        (Arc::new(controller), Arc::new(loader))
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<RenderCommand>) -> RenderCommand {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for render command")
            .expect("render channel closed")
    }

    fn center(lod: u8) -> GeoCoordinate {
        quadkey_to_bounding_box(&create_quadkey(GeoCoordinate::new(52.505, 13.405), lod)).center()
    }

    #[tokio::test]
    async fn test_loaded_tile_is_streamed() {
        let dir = TempDir::new().unwrap();
        let (controller, loader) = setup(&dir, false);
        let (streamer, mut rx) = TileStreamer::start(Arc::clone(&controller), loader);

        controller.on_geo_position(center(16), 16).unwrap();

        assert!(matches!(next(&mut rx).await, RenderCommand::Activate(_)));
        assert!(matches!(next(&mut rx).await, RenderCommand::Data { .. }));
        match next(&mut rx).await {
            RenderCommand::Completed { summary, .. } => {
                assert_eq!(summary.meshes, 1);
                assert!(summary.from_store);
            }
            other => panic!("expected Completed, got {:?}", other),
        }

        streamer.shutdown().await;
    }

    #[tokio::test]
    async fn test_tiles_loaded_before_start_are_streamed() {
        let dir = TempDir::new().unwrap();
        let (controller, loader) = setup(&dir, false);
        controller.on_geo_position(center(16), 16).unwrap();

        let (streamer, mut rx) = TileStreamer::start(Arc::clone(&controller), loader);

        assert!(matches!(next(&mut rx).await, RenderCommand::Activate(_)));
        streamer.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_load_drops_tile() {
        let dir = TempDir::new().unwrap();
        let (controller, loader) = setup(&dir, true);
        let (streamer, mut rx) = TileStreamer::start(Arc::clone(&controller), loader);
        let quadkey = create_quadkey(center(16), 16);

        controller.on_geo_position(center(16), 16).unwrap();

        assert!(matches!(next(&mut rx).await, RenderCommand::Activate(_)));
        match next(&mut rx).await {
            RenderCommand::Failed { quadkey: failed, error } => {
                assert_eq!(failed, quadkey);
                assert!(matches!(error, PipelineError::Engine { .. }));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert!(matches!(next(&mut rx).await, RenderCommand::Deactivate(_)));
        assert!(!controller.is_loaded(&quadkey));

        streamer.shutdown().await;
    }

    #[tokio::test]
    async fn test_unloaded_tile_is_deactivated_and_cancelled() {
        let dir = TempDir::new().unwrap();
        let (controller, loader) = setup(&dir, false);
        let (streamer, mut rx) = TileStreamer::start(Arc::clone(&controller), loader);

        controller.on_geo_position(center(16), 16).unwrap();
        let tile = match next(&mut rx).await {
            RenderCommand::Activate(tile) => tile,
            other => panic!("expected Activate, got {:?}", other),
        };
        controller.unload_all();

        loop {
            if let RenderCommand::Deactivate(gone) = next(&mut rx).await {
                assert!(Arc::ptr_eq(&gone, &tile));
                break;
            }
        }
        assert!(tile.cancellation().is_cancelled());

        streamer.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_streamer() {
        let dir = TempDir::new().unwrap();
        let (controller, loader) = setup(&dir, false);
        let (streamer, _rx) = TileStreamer::start(controller, loader);
        assert!(streamer.is_running());

        let token = streamer.shutdown_token();
        streamer.shutdown().await;
        assert!(token.is_cancelled());
    }
}
