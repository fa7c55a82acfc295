//! Remote object storage.

use std::path::Path;

use crate::domain::error::FeatureError;

pub trait ObjectStorePort {
    fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<(), FeatureError>;
}
