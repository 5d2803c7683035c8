//! Media storage collaborators
//!
//! The image optimizer and the blob store are external collaborators in
//! this system; the seams are kept explicit so the optimizer can be a
//! real vendor integration in one deployment and a pass-through in
//! another. The filesystem store writes optimized images under the data
//! directory's `media/` folder, which the server also serves statically.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use vril_common::Result;

/// Image optimization seam
///
/// Implementations receive raw downloaded bytes and return the bytes to
/// persist. Failures bubble up to the ingestion pipeline, which treats
/// them as a degraded (warning) outcome rather than a fatal one.
pub trait ImageOptimizer: Send + Sync {
    fn optimize(&self, bytes: Vec<u8>) -> Result<Vec<u8>>;
}

/// Pass-through optimizer: stores images exactly as downloaded
pub struct PassthroughOptimizer;

impl ImageOptimizer for PassthroughOptimizer {
    fn optimize(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        Ok(bytes)
    }
}

/// Filesystem-backed blob store for movie images
#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
    optimizer: Arc<dyn ImageOptimizer>,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self::with_optimizer(root, Arc::new(PassthroughOptimizer))
    }

    pub fn with_optimizer(root: PathBuf, optimizer: Arc<dyn ImageOptimizer>) -> Self {
        Self { root, optimizer }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Optimize and persist an image, returning its store-relative path
    pub fn store_image(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let optimized = self.optimizer.optimize(bytes)?;

        std::fs::create_dir_all(&self.root)?;
        let target = self.root.join(file_name);
        std::fs::write(&target, optimized)?;

        tracing::debug!(file = %target.display(), "Stored media asset");

        Ok(format!("media/{}", file_name))
    }

    /// Best-effort removal of a previously stored image
    ///
    /// A missing file is not an error: the asset row is the source of
    /// truth and stray files are harmless.
    pub fn remove(&self, store_path: &str) {
        let file_name = store_path.strip_prefix("media/").unwrap_or(store_path);
        let target = self.root.join(file_name);

        if let Err(e) = std::fs::remove_file(&target) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(file = %target.display(), error = %e, "Failed to remove media asset");
            }
        }
    }
}

/// Build the stored file name for a movie image
///
/// `the-matrix-603-poster.jpg`: slug keeps it readable, the TMDb ID keeps
/// it unique, the extension follows the source path.
pub fn image_file_name(title: &str, tmdb_id: i64, kind: &str, source_path: &str) -> String {
    let extension = Path::new(source_path)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("jpg");

    format!(
        "{}-{}-{}.{}",
        crate::text::slugify(title),
        tmdb_id,
        kind,
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vril_common::Error;

    struct FailingOptimizer;

    impl ImageOptimizer for FailingOptimizer {
        fn optimize(&self, _bytes: Vec<u8>) -> Result<Vec<u8>> {
            Err(Error::Internal("optimizer unavailable".to_string()))
        }
    }

    #[test]
    fn file_names_are_slugged_and_unique_per_movie() {
        assert_eq!(
            image_file_name("The Matrix", 603, "poster", "/f89h.jpg"),
            "the-matrix-603-poster.jpg"
        );
        assert_eq!(
            image_file_name("Amélie", 194, "backdrop", "/x.png"),
            "amelie-194-backdrop.png"
        );
        // hostile extension falls back to jpg
        assert_eq!(
            image_file_name("X", 1, "poster", "/weird.p!g"),
            "x-1-poster.jpg"
        );
    }

    #[test]
    fn store_and_remove_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MediaStore::new(dir.path().to_path_buf());

        let path = store
            .store_image("the-matrix-603-poster.jpg", vec![1, 2, 3])
            .expect("store");
        assert_eq!(path, "media/the-matrix-603-poster.jpg");
        assert!(dir.path().join("the-matrix-603-poster.jpg").exists());

        store.remove(&path);
        assert!(!dir.path().join("the-matrix-603-poster.jpg").exists());

        // removing again is quietly fine
        store.remove(&path);
    }

    #[test]
    fn failing_optimizer_propagates_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MediaStore::with_optimizer(dir.path().to_path_buf(), Arc::new(FailingOptimizer));

        assert!(store.store_image("x.jpg", vec![0]).is_err());
    }
}
