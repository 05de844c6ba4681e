//! File system and path resolution ports.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::error::PipelineError;

/// Asynchronous file access by resolved path.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> impl Future<Output = bool> + Send;

    fn read_text(&self, path: &Path) -> impl Future<Output = Result<String, PipelineError>> + Send;

    fn read_bytes(&self, path: &Path)
        -> impl Future<Output = Result<Vec<u8>, PipelineError>> + Send;

    /// Writes `data` so that readers never observe a partial file.
    fn write_bytes(
        &self,
        path: &Path,
        data: &[u8],
    ) -> impl Future<Output = Result<(), PipelineError>> + Send;

    fn create_dir_all(&self, path: &Path) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

/// [`FileSystem`] over `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl FileSystem for TokioFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_text(&self, path: &Path) -> Result<String, PipelineError> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, PipelineError> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn write_bytes(&self, path: &Path, data: &[u8]) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);
        tokio::fs::write(&temp_path, data).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        trace!(path = %path.display(), bytes = data.len(), "File written");
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), PipelineError> {
        Ok(tokio::fs::create_dir_all(path).await?)
    }
}

/// Maps logical paths (as written in configuration) to platform paths.
pub trait PathResolver: Send + Sync {
    fn resolve(&self, logical: &Path) -> PathBuf;
}

/// Resolves relative paths against a root directory; absolute paths pass
/// through unchanged.
#[derive(Debug, Clone)]
pub struct RootPathResolver {
    root: PathBuf,
}

impl RootPathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PathResolver for RootPathResolver {
    fn resolve(&self, logical: &Path) -> PathBuf {
        if logical.is_absolute() {
            logical.to_path_buf()
        } else {
            self.root.join(logical)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem;
        let path = dir.path().join("nested/dir/0313.osm");

        assert!(!fs.exists(&path).await);
        fs.write_bytes(&path, b"<osm/>").await.unwrap();

        assert!(fs.exists(&path).await);
        assert_eq!(fs.read_text(&path).await.unwrap(), "<osm/>");
        assert_eq!(fs.read_bytes(&path).await.unwrap(), b"<osm/>");
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem;
        fs.write_bytes(&dir.path().join("1.osm"), b"data").await.unwrap();

        let temp_files = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .count();
        assert_eq!(temp_files, 0);
    }

    #[tokio::test]
    async fn test_read_missing_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = TokioFileSystem.read_text(&dir.path().join("missing")).await;
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_root_path_resolver() {
        let resolver = RootPathResolver::new("/opt/tilescape");
        assert_eq!(
            resolver.resolve(Path::new("default.mapcss")),
            PathBuf::from("/opt/tilescape/default.mapcss")
        );
        assert_eq!(
            resolver.resolve(Path::new("/etc/style.mapcss")),
            PathBuf::from("/etc/style.mapcss")
        );
    }
}
