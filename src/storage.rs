//! Coordinate-indexed image storage
//!
//! [`StorageRam`] keeps every image in memory, keyed by its [`Coords`], and
//! tracks which axes have been used and the largest index seen on each. The
//! map and that bookkeeping live behind a single mutex; the representative
//! image returned by [`ImageStorage::get_any_image`] is cached outside it so
//! repeated lookups do not contend with writers.

use crate::config::{AnyImageCache, StorageConfig};
use crate::coords::Coords;
use crate::error::{Result, StoreError};
use crate::events::{DataEvent, DataEventListener};
use crate::image::{Image, ImageFormat};
use crate::metadata::SummaryMetadata;
use crate::utils::{format_bytes, join_axes};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Read and write access to a coordinate-indexed image store.
///
/// Every method fails with [`StoreError::ClosedStore`] once
/// [`close`](ImageStorage::close) has been called.
pub trait ImageStorage: Send + Sync {
    /// Store an image at its coordinate, replacing any image already there
    fn put_image(&self, image: Image) -> Result<()>;

    /// Signal that no more images will be written
    fn freeze(&self) -> Result<()>;

    /// Exact-coordinate lookup
    fn get_image(&self, coords: &Coords) -> Result<Option<Arc<Image>>>;

    /// Some stored image, for callers that only need the dataset's format
    fn get_any_image(&self) -> Result<Option<Arc<Image>>>;

    /// Images whose coordinate equals `coords` on every axis
    fn get_images_matching(&self, coords: &Coords) -> Result<Vec<Arc<Image>>>;

    /// Images whose coordinate equals `coords` once `ignore_axes` are removed from it
    fn get_images_ignoring_axes(
        &self,
        coords: &Coords,
        ignore_axes: &[&str],
    ) -> Result<Vec<Arc<Image>>>;

    /// Snapshot of every stored coordinate, in no particular order
    fn get_unordered_image_coords(&self) -> Result<Vec<Coords>>;

    fn has_image(&self, coords: &Coords) -> Result<bool>;

    /// Largest index seen on `axis`, or 0 if the axis was never used
    fn get_max_index(&self, axis: &str) -> Result<usize>;

    /// Largest index seen on every axis in use
    fn get_max_indices(&self) -> Result<Coords>;

    /// Axis names every stored coordinate has contributed, sorted
    fn axes_in_use(&self) -> Result<Vec<String>>;

    /// Axis order declared by the summary metadata
    fn get_axes(&self) -> Result<Vec<String>>;

    fn get_summary_metadata(&self) -> Result<Arc<SummaryMetadata>>;

    /// Number of distinct stored coordinates
    fn get_num_images(&self) -> Result<usize>;

    fn stats(&self) -> Result<StorageStats>;

    /// Release all images. Subsequent calls fail with [`StoreError::ClosedStore`].
    fn close(&self) -> Result<()>;
}

/// Storage that also supports removing images
pub trait RewritableStorage: ImageStorage {
    /// Remove the image at `coords`, failing with [`StoreError::NotFound`] if there is none.
    ///
    /// Axis bookkeeping is not rolled back: [`ImageStorage::get_max_index`] and
    /// [`ImageStorage::axes_in_use`] keep describing everything ever stored.
    fn delete_image(&self, coords: &Coords) -> Result<()>;
}

enum StoreState {
    Open(StoreContents),
    Closed,
}

#[derive(Default)]
struct StoreContents {
    images: HashMap<Coords, Arc<Image>>,

    /// Running maximum per axis. Its key set is the set of axes in use.
    max_indices: BTreeMap<String, usize>,

    /// Format of the first image ever stored
    format: Option<ImageFormat>,
}

impl StoreContents {
    fn record_axes(&mut self, coords: &Coords) {
        for (axis, index) in coords.iter() {
            match self.max_indices.get_mut(axis) {
                Some(max) if *max < index => *max = index,
                Some(_) => {}
                None => {
                    self.max_indices.insert(axis.to_string(), index);
                }
            }
        }
    }

    fn payload_bytes(&self) -> usize {
        self.images.values().map(|image| image.pixels().len()).sum()
    }
}

/// In-memory [`RewritableStorage`]
pub struct StorageRam {
    config: StorageConfig,
    state: Mutex<StoreState>,

    /// Representative image. Only written while `state` is locked.
    any_image: RwLock<Option<Arc<Image>>>,

    summary: RwLock<Arc<SummaryMetadata>>,
}

impl StorageRam {
    /// Create an empty storage
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            state: Mutex::new(StoreState::Open(StoreContents::default())),
            any_image: RwLock::new(None),
            summary: RwLock::new(Arc::new(SummaryMetadata::default())),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), StoreState::Closed)
    }

    /// Run `f` against the contents under the store lock
    fn with_contents<R>(&self, f: impl FnOnce(&mut StoreContents) -> R) -> Result<R> {
        match &mut *self.state.lock() {
            StoreState::Open(contents) => Ok(f(contents)),
            StoreState::Closed => Err(StoreError::ClosedStore),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        self.with_contents(|_| ())
    }

    fn cached_coords_are(&self, coords: &Coords) -> bool {
        self.any_image
            .read()
            .as_ref()
            .is_some_and(|cached| cached.coords() == coords)
    }
}

impl Default for StorageRam {
    fn default() -> Self {
        Self::new(StorageConfig::default())
    }
}

impl ImageStorage for StorageRam {
    fn put_image(&self, image: Image) -> Result<()> {
        image.coords().validate()?;
        let image = Arc::new(image);

        self.with_contents(|contents| {
            if let Some(expected) = contents.format {
                if self.config.check_image_sizes {
                    if let Err(err) = expected.check_compatible(&image.format()) {
                        warn!(
                            coords = %image.coords(),
                            expected = %expected,
                            actual = %image.format(),
                            "Rejected image with mismatched size"
                        );
                        return Err(err);
                    }
                }
            } else {
                contents.format = Some(image.format());
            }

            contents.record_axes(image.coords());
            let replaced = contents
                .images
                .insert(image.coords().clone(), Arc::clone(&image))
                .is_some();

            if replaced
                && self.config.any_image_cache == AnyImageCache::Invalidating
                && self.cached_coords_are(image.coords())
            {
                *self.any_image.write() = Some(Arc::clone(&image));
            }

            trace!(coords = %image.coords(), replaced, "Stored image");
            Ok(())
        })?
    }

    fn freeze(&self) -> Result<()> {
        // Nothing to flush; the datastore is what stops further writes.
        self.ensure_open()
    }

    fn get_image(&self, coords: &Coords) -> Result<Option<Arc<Image>>> {
        self.with_contents(|contents| contents.images.get(coords).cloned())
    }

    fn get_any_image(&self) -> Result<Option<Arc<Image>>> {
        if let Some(image) = self.any_image.read().clone() {
            return Ok(Some(image));
        }

        self.with_contents(|contents| {
            let image = contents.images.values().next().cloned();
            if let Some(image) = &image {
                *self.any_image.write() = Some(Arc::clone(image));
            }
            image
        })
    }

    fn get_images_matching(&self, coords: &Coords) -> Result<Vec<Arc<Image>>> {
        // Full equality only. Matching on a subset of axes is deliberately not supported.
        self.with_contents(|contents| contents.images.get(coords).cloned().into_iter().collect())
    }

    fn get_images_ignoring_axes(
        &self,
        coords: &Coords,
        ignore_axes: &[&str],
    ) -> Result<Vec<Arc<Image>>> {
        self.with_contents(|contents| {
            let any_ignored_in_use = ignore_axes
                .iter()
                .any(|axis| contents.max_indices.contains_key(*axis));

            if !any_ignored_in_use {
                // No stored coordinate carries an ignored axis, so stripping is a no-op
                return contents.images.get(coords).cloned().into_iter().collect();
            }

            trace!(
                coords = %coords,
                ignored = %join_axes(ignore_axes),
                images = contents.images.len(),
                "Scanning storage for axis-elided match"
            );
            contents
                .images
                .values()
                .filter(|image| image.coords().matches_ignoring_axes(coords, ignore_axes))
                .cloned()
                .collect()
        })
    }

    fn get_unordered_image_coords(&self) -> Result<Vec<Coords>> {
        self.with_contents(|contents| contents.images.keys().cloned().collect())
    }

    fn has_image(&self, coords: &Coords) -> Result<bool> {
        self.with_contents(|contents| contents.images.contains_key(coords))
    }

    fn get_max_index(&self, axis: &str) -> Result<usize> {
        self.with_contents(|contents| contents.max_indices.get(axis).copied().unwrap_or(0))
    }

    fn get_max_indices(&self) -> Result<Coords> {
        self.with_contents(|contents| {
            contents
                .max_indices
                .iter()
                .map(|(axis, &index)| (axis.clone(), index))
                .collect()
        })
    }

    fn axes_in_use(&self) -> Result<Vec<String>> {
        self.with_contents(|contents| contents.max_indices.keys().cloned().collect())
    }

    fn get_axes(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.summary.read().axis_order.clone())
    }

    fn get_summary_metadata(&self) -> Result<Arc<SummaryMetadata>> {
        self.ensure_open()?;
        Ok(self.summary.read().clone())
    }

    fn get_num_images(&self) -> Result<usize> {
        self.with_contents(|contents| contents.images.len())
    }

    fn stats(&self) -> Result<StorageStats> {
        self.with_contents(|contents| StorageStats {
            num_images: contents.images.len(),
            axes_in_use: contents.max_indices.keys().cloned().collect(),
            max_indices: contents
                .max_indices
                .iter()
                .map(|(axis, &index)| (axis.clone(), index))
                .collect(),
            format: contents.format,
            payload_bytes: contents.payload_bytes(),
        })
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        let num_images = match &*state {
            StoreState::Open(contents) => contents.images.len(),
            StoreState::Closed => return Err(StoreError::ClosedStore),
        };
        // Cleared before the state flips, regardless of policy, so the lock-free
        // read in get_any_image cannot serve an image once close has taken effect
        *self.any_image.write() = None;
        *state = StoreState::Closed;
        info!(num_images, "Closed RAM storage");
        Ok(())
    }
}

impl RewritableStorage for StorageRam {
    fn delete_image(&self, coords: &Coords) -> Result<()> {
        self.with_contents(|contents| {
            if contents.images.remove(coords).is_none() {
                return Err(StoreError::NotFound(coords.clone()));
            }
            if self.config.any_image_cache == AnyImageCache::Invalidating
                && self.cached_coords_are(coords)
            {
                *self.any_image.write() = None;
            }
            debug!(coords = %coords, remaining = contents.images.len(), "Deleted image");
            Ok(())
        })?
    }
}

impl DataEventListener for StorageRam {
    fn on_event(&self, event: &DataEvent) {
        if let DataEvent::NewSummaryMetadata(metadata) = event {
            if self.is_closed() {
                debug!("Ignoring summary metadata for closed storage");
                return;
            }
            *self.summary.write() = Arc::clone(metadata);
            debug!(axes = %join_axes(&metadata.axis_order), "Replaced summary metadata");
        }
    }
}

/// Point-in-time statistics of a storage
#[derive(Debug, Clone, PartialEq)]
pub struct StorageStats {
    pub num_images: usize,
    pub axes_in_use: Vec<String>,
    pub max_indices: Coords,
    pub format: Option<ImageFormat>,
    pub payload_bytes: usize,
}

impl StorageStats {
    pub fn summary(&self) -> String {
        let format = self
            .format
            .map(|f| f.to_string())
            .unwrap_or_else(|| "no format".to_string());
        format!(
            "{} images [{}], max {}, {}, {} in memory",
            self.num_images,
            join_axes(&self.axes_in_use),
            self.max_indices,
            format,
            format_bytes(self.payload_bytes),
        )
    }
}
