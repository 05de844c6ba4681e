//! One-time configured facade over the spatial engine.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::engine::{
    EngineCallbacks, EngineError, ElevationDataType, SpatialEngine, StorageKind, StoreTarget,
};
use super::error::PipelineError;
use crate::config::IndexSettings;
use crate::coord::{QuadKey, MAX_LEVEL_OF_DETAIL};
use crate::range::Range;

/// Wraps the engine and enforces its setup discipline.
///
/// `configure` must run exactly once before any data operation. A second
/// call is a programmer error and reported as
/// [`PipelineError::AlreadyConfigured`].
pub struct MapDataLibrary {
    engine: Arc<dyn SpatialEngine>,
    configured: AtomicBool,
}

impl MapDataLibrary {
    pub fn new(engine: Arc<dyn SpatialEngine>) -> Self {
        Self {
            engine,
            configured: AtomicBool::new(false),
        }
    }

    /// Creates the index directories and hands them to the engine.
    pub fn configure(&self, index: &IndexSettings) -> Result<(), PipelineError> {
        if index.string_path.as_os_str().is_empty() || index.spatial_path.as_os_str().is_empty()
        {
            return Err(PipelineError::Config(
                "index.string_path and index.spatial_path must be set".to_string(),
            ));
        }

        if self
            .configured
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PipelineError::AlreadyConfigured);
        }

        let result = self.configure_engine(index);
        if result.is_err() {
            self.configured.store(false, Ordering::Release);
        }
        result
    }

    fn configure_engine(&self, index: &IndexSettings) -> Result<(), PipelineError> {
        std::fs::create_dir_all(&index.string_path)?;
        std::fs::create_dir_all(&index.spatial_path)?;

        self.engine
            .configure(&index.string_path, &index.spatial_path)
            .map_err(|EngineError(message)| PipelineError::Config(message))?;

        info!(
            strings = %index.string_path.display(),
            spatial = %index.spatial_path.display(),
            "Map data library configured"
        );
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    fn ensure_configured(&self) -> Result<(), PipelineError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(PipelineError::NotConfigured)
        }
    }

    pub fn has_data(&self, quadkey: &QuadKey) -> Result<bool, PipelineError> {
        self.ensure_configured()?;
        Ok(self.engine.has_data(quadkey))
    }

    /// Imports a data file. A non-empty engine message fails the tile.
    pub fn add_to_store(
        &self,
        storage: StorageKind,
        style_path: &Path,
        data_path: &Path,
        target: StoreTarget,
        quadkey: &QuadKey,
    ) -> Result<(), PipelineError> {
        self.ensure_configured()?;
        debug!(
            quadkey = %quadkey,
            data = %data_path.display(),
            ?storage,
            ?target,
            "Adding map data to store"
        );

        self.store(storage, style_path, data_path, target)
            .map_err(|message| PipelineError::Store {
                quadkey: *quadkey,
                message,
            })
    }

    /// Bulk-imports a data file for every level of detail in `range`.
    ///
    /// Used for base data covering many tiles, such as a country extract,
    /// so later tile loads find it in the store.
    pub fn import_lod_range(
        &self,
        storage: StorageKind,
        style_path: &Path,
        data_path: &Path,
        range: Range<u8>,
    ) -> Result<(), PipelineError> {
        self.ensure_configured()?;
        if !range.is_valid() || range.max > MAX_LEVEL_OF_DETAIL {
            return Err(PipelineError::Config(format!(
                "import range {} must lie within 0-{}",
                range, MAX_LEVEL_OF_DETAIL
            )));
        }
        info!(
            data = %data_path.display(),
            ?storage,
            lods = %range,
            "Importing map data"
        );

        self.store(storage, style_path, data_path, StoreTarget::LodRange(range))
            .map_err(|message| PipelineError::Import { range, message })
    }

    /// Engine import; `Err` carries a non-empty engine message.
    fn store(
        &self,
        storage: StorageKind,
        style_path: &Path,
        data_path: &Path,
        target: StoreTarget,
    ) -> Result<(), String> {
        match self.engine.add_to_store(storage, style_path, data_path, target) {
            Err(EngineError(message)) if !message.is_empty() => Err(message),
            _ => Ok(()),
        }
    }

    /// Runs the engine load for `quadkey`. Blocking.
    pub fn load_quadkey(
        &self,
        style_path: &Path,
        quadkey: &QuadKey,
        elevation: ElevationDataType,
        callbacks: &mut dyn EngineCallbacks,
    ) -> Result<(), PipelineError> {
        self.ensure_configured()?;
        self.engine
            .load_quadkey(style_path, quadkey, elevation, callbacks);
        Ok(())
    }
}
