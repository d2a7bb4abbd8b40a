//! Storage configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How [`StorageRam::get_any_image`](crate::storage::StorageRam::get_any_image)
/// treats its cached representative image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnyImageCache {
    /// The cache follows the store: deleting the cached coordinate or closing
    /// the store clears it, and overwriting the cached coordinate refreshes it.
    #[default]
    Invalidating,
    /// Once populated the cache is never revalidated. It may return an image
    /// that has since been deleted or overwritten; use it only as a hint for
    /// the dataset's size and format.
    Sticky,
}

/// Configuration for a RAM storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Representative image cache policy
    pub any_image_cache: AnyImageCache,

    /// Reject images whose size or pixel format differs from the first image stored
    pub check_image_sizes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            any_image_cache: AnyImageCache::default(),
            check_image_sizes: true,
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the representative image cache policy
    pub fn with_any_image_cache(mut self, policy: AnyImageCache) -> Self {
        self.any_image_cache = policy;
        self
    }

    /// Enable or disable size checks on insert
    pub fn with_check_image_sizes(mut self, check: bool) -> Self {
        self.check_image_sizes = check;
        self
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
