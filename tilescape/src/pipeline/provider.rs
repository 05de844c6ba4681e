//! Map data providers.
//!
//! A provider turns a tile into a local file the engine can import. The
//! remote provider keeps one `<quadkey>.<ext>` file per tile in its cache
//! directory and only goes to the network on a cache miss.
//!
//! ```text
//! ProviderChain ── lod 1-15 ──► RemoteDataProvider::mapzen
//!               └─ lod 16-23 ─► RemoteDataProvider::openstreetmap
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::PipelineError;
use super::filesystem::FileSystem;
use super::network::NetworkService;
use crate::config::{CacheSettings, DataSettings};
use crate::range::{Range, RangeTree};
use crate::tile::Tile;

/// Resolves the map data file for a tile.
pub trait MapDataProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Returns a local file holding the tile's map data.
    fn resolve<'a>(&'a self, tile: &'a Tile) -> BoxFuture<'a, Result<PathBuf, PipelineError>>;
}

/// Expands a URL template for `tile`.
///
/// Understands `{quadkey}`, `{x}`, `{y}`, `{lod}`, `{bbox}`
/// (`minLon,minLat,maxLon,maxLat`) and `{api_key}`.
pub fn expand_url(template: &str, tile: &Tile, api_key: Option<&str>) -> String {
    let quadkey = tile.quadkey();
    template
        .replace("{quadkey}", &quadkey.to_string())
        .replace("{x}", &quadkey.tile_x.to_string())
        .replace("{y}", &quadkey.tile_y.to_string())
        .replace("{lod}", &quadkey.level_of_detail.to_string())
        .replace("{bbox}", &tile.bounding_box().to_query())
        .replace("{api_key}", api_key.unwrap_or(""))
}

/// Cache-or-fetch discipline shared by the remote providers.
///
/// Cache writes go through one coarse lock. The existence check is repeated
/// after acquiring it, so concurrent misses for the same file write it once.
pub(crate) struct CachedFetcher<N, F> {
    network: Arc<N>,
    fs: Arc<F>,
    write_lock: Mutex<()>,
}

impl<N: NetworkService, F: FileSystem> CachedFetcher<N, F> {
    pub(crate) fn new(network: Arc<N>, fs: Arc<F>) -> Self {
        Self {
            network,
            fs,
            write_lock: Mutex::new(()),
        }
    }

    /// Ensures `path` exists, downloading it from `url` if needed.
    ///
    /// Returns `true` if the file was already cached.
    pub(crate) async fn fetch_to(
        &self,
        path: &Path,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, PipelineError> {
        if self.fs.exists(path).await {
            debug!(path = %path.display(), "Cache hit");
            return Ok(true);
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        debug!(url = url, "Cache miss, fetching");
        let bytes = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = self.network.get_bytes(url) => result?,
        };

        let _guard = self.write_lock.lock().await;
        if !self.fs.exists(path).await {
            self.fs.write_bytes(path, &bytes).await?;
            info!(path = %path.display(), bytes = bytes.len(), "Cached downloaded data");
        }
        Ok(false)
    }
}

/// Downloads map data from a templated URL into a cache directory.
pub struct RemoteDataProvider<N, F> {
    name: String,
    url_template: String,
    api_key: Option<String>,
    cache_dir: PathBuf,
    extension: String,
    fetcher: CachedFetcher<N, F>,
}

impl<N: NetworkService, F: FileSystem> RemoteDataProvider<N, F> {
    pub fn new(
        name: impl Into<String>,
        url_template: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        network: Arc<N>,
        fs: Arc<F>,
    ) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            api_key: None,
            cache_dir: cache_dir.into(),
            extension: extension.into(),
            fetcher: CachedFetcher::new(network, fs),
        }
    }

    /// OpenStreetMap XML, cached as `<quadkey>.osm`.
    pub fn openstreetmap(
        url_template: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        network: Arc<N>,
        fs: Arc<F>,
    ) -> Self {
        Self::new("openstreetmap", url_template, cache_dir, "osm", network, fs)
    }

    /// Mapzen vector tiles, cached as `<quadkey>.mapzen`.
    pub fn mapzen(
        url_template: impl Into<String>,
        api_key: Option<String>,
        cache_dir: impl Into<PathBuf>,
        network: Arc<N>,
        fs: Arc<F>,
    ) -> Self {
        Self::new("mapzen", url_template, cache_dir, "mapzen", network, fs).with_api_key(api_key)
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Cache file for `tile`.
    pub fn cache_path(&self, tile: &Tile) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", tile.quadkey(), self.extension))
    }

    pub fn url_for(&self, tile: &Tile) -> String {
        expand_url(&self.url_template, tile, self.api_key.as_deref())
    }
}

impl<N: NetworkService, F: FileSystem> MapDataProvider for RemoteDataProvider<N, F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve<'a>(&'a self, tile: &'a Tile) -> BoxFuture<'a, Result<PathBuf, PipelineError>> {
        Box::pin(async move {
            let path = self.cache_path(tile);
            let url = self.url_for(tile);
            self.fetcher
                .fetch_to(&path, &url, tile.cancellation())
                .await?;
            Ok(path)
        })
    }
}

/// Providers keyed by the level of detail they serve.
///
/// Lookup picks the provider with the lowest matching range; ranges with
/// the same lower bound keep registration order.
#[derive(Default)]
pub struct ProviderChain {
    providers: RangeTree<u8, Arc<dyn MapDataProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// The Mapzen and OpenStreetMap providers with their configured ranges,
    /// both caching under `cache.directory`.
    pub fn from_config<N, F>(
        data: &DataSettings,
        cache: &CacheSettings,
        network: Arc<N>,
        fs: Arc<F>,
    ) -> Self
    where
        N: NetworkService + 'static,
        F: FileSystem + 'static,
    {
        let mapzen = RemoteDataProvider::mapzen(
            &data.mapzen_url,
            data.mapzen_api_key.clone(),
            &cache.directory,
            Arc::clone(&network),
            Arc::clone(&fs),
        );
        let osm = RemoteDataProvider::openstreetmap(&data.osm_url, &cache.directory, network, fs);

        Self::new()
            .with(data.mapzen_lod_range, Arc::new(mapzen))
            .with(data.osm_lod_range, Arc::new(osm))
    }

    pub fn with(mut self, range: Range<u8>, provider: Arc<dyn MapDataProvider>) -> Self {
        self.register(range, provider);
        self
    }

    pub fn register(&mut self, range: Range<u8>, provider: Arc<dyn MapDataProvider>) {
        debug!(provider = provider.name(), %range, "Provider registered");
        self.providers.insert(range.min, range.max, provider);
    }

    /// Provider serving `level_of_detail`, if any.
    pub fn select(&self, level_of_detail: u8) -> Option<&Arc<dyn MapDataProvider>> {
        self.providers.first(&level_of_detail)
    }

    /// Resolves `tile` through the first provider covering its level of detail.
    pub async fn resolve(&self, tile: &Tile) -> Result<PathBuf, PipelineError> {
        let lod = tile.quadkey().level_of_detail;
        let provider = self.select(lod).ok_or(PipelineError::NoProvider(lod))?;
        debug!(quadkey = %tile.quadkey(), provider = provider.name(), "Resolving map data");
        provider.resolve(tile).await
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
