//! Object storage mirrored onto a local directory tree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::FeatureError;
use crate::ports::object_store_port::ObjectStorePort;

/// Stores `bucket/key` as `<root>/<bucket>/<key>`.
pub struct MirrorObjectStore {
    root: PathBuf,
}

impl MirrorObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.root.join(bucket);
        for part in key.split('/').filter(|p| !p.is_empty() && *p != "." && *p != "..") {
            path.push(part);
        }
        path
    }
}

impl ObjectStorePort for MirrorObjectStore {
    fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<(), FeatureError> {
        let upload_error = |reason: String| FeatureError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason,
        };
        let target = self.object_path(bucket, key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| upload_error(e.to_string()))?;
        }
        fs::copy(local, &target).map_err(|e| upload_error(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn upload_copies_under_bucket_and_key() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("ModelData.csv");
        fs::write(&local, "date\n2024/01/01\n").unwrap();

        let store = MirrorObjectStore::new(dir.path().join("mirror"));
        store.upload(&local, "models", "2586/ModelData.csv").unwrap();

        let copied = dir.path().join("mirror/models/2586/ModelData.csv");
        assert_eq!(fs::read_to_string(copied).unwrap(), "date\n2024/01/01\n");
    }

    #[test]
    fn key_cannot_escape_bucket() {
        let store = MirrorObjectStore::new(PathBuf::from("/mirror"));
        assert_eq!(
            store.object_path("b", "../../etc/passwd"),
            PathBuf::from("/mirror/b/etc/passwd")
        );
    }

    #[test]
    fn missing_local_file_is_upload_error() {
        let dir = TempDir::new().unwrap();
        let store = MirrorObjectStore::new(dir.path().to_path_buf());
        let err = store
            .upload(Path::new("/nonexistent/ModelData.csv"), "models", "x/ModelData.csv")
            .unwrap_err();
        assert!(matches!(err, FeatureError::Upload { bucket, .. } if bucket == "models"));
    }
}
