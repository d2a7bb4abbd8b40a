//! Datastore - main API for writing and reading coordinate-addressed images

use crate::config::StorageConfig;
use crate::coords::Coords;
use crate::error::{Result, StoreError};
use crate::events::{DataEvent, DataEventListener, EventBus, SubscriptionId, STORAGE_PRIORITY};
use crate::image::Image;
use crate::metadata::SummaryMetadata;
use crate::storage::{RewritableStorage, StorageRam, StorageStats};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Owning session for a storage.
///
/// Writes go to the storage first and are announced on the event bus only
/// afterwards, so a subscriber reacting to [`DataEvent::NewImage`] can always
/// read the image back. Summary metadata travels the other way: it is posted
/// on the bus, where the storage is the first subscriber.
pub struct Datastore {
    id: Uuid,
    created_at: DateTime<Utc>,
    storage: Arc<dyn RewritableStorage>,
    storage_subscription: SubscriptionId,
    bus: EventBus,
    // Held shared across every storage write, exclusively while freezing
    frozen: RwLock<bool>,
}

impl Datastore {
    /// Create a datastore backed by a fresh [`StorageRam`]
    pub fn new_ram(config: StorageConfig) -> Self {
        Self::with_storage(Arc::new(StorageRam::new(config)))
    }

    /// Create a datastore around an existing storage.
    ///
    /// The storage is subscribed at [`STORAGE_PRIORITY`] so it sees every event first.
    pub fn with_storage<S>(storage: Arc<S>) -> Self
    where
        S: RewritableStorage + DataEventListener + 'static,
    {
        let bus = EventBus::new();
        let listener: Arc<dyn DataEventListener> = storage.clone();
        let storage_subscription = bus.register(listener, STORAGE_PRIORITY);
        let id = Uuid::new_v4();
        info!(datastore = %id, "Created datastore");

        Self {
            id,
            created_at: Utc::now(),
            storage,
            storage_subscription,
            bus,
            frozen: RwLock::new(false),
        }
    }

    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Subscribe to datastore events.
    ///
    /// Priorities at or below [`STORAGE_PRIORITY`] are raised to
    /// `STORAGE_PRIORITY + 1`; nothing may be notified before the storage.
    pub fn register_listener(
        &self,
        listener: Arc<dyn DataEventListener>,
        priority: i32,
    ) -> SubscriptionId {
        self.bus.register(listener, priority.max(STORAGE_PRIORITY + 1))
    }

    pub fn unregister_listener(&self, id: SubscriptionId) -> bool {
        if id == self.storage_subscription {
            return false;
        }
        self.bus.unregister(id)
    }

    /// Run a storage write unless the datastore is frozen.
    ///
    /// The freeze flag stays read-locked for the duration of `write`, so
    /// [`freeze`](Self::freeze) cannot return while a write is in flight.
    fn write_unless_frozen<R>(&self, write: impl FnOnce() -> Result<R>) -> Result<R> {
        let frozen = self.frozen.read();
        if *frozen {
            return Err(StoreError::Frozen);
        }
        write()
    }

    /// Store an image, then announce it
    pub fn put_image(&self, image: Image) -> Result<()> {
        let coords = image.coords().clone();
        self.write_unless_frozen(|| self.storage.put_image(image))?;
        self.bus.post(&DataEvent::NewImage { coords });
        Ok(())
    }

    /// Replace the summary metadata
    pub fn set_summary_metadata(&self, metadata: SummaryMetadata) -> Result<()> {
        if self.is_frozen() {
            return Err(StoreError::Frozen);
        }
        // Surface ClosedStore instead of posting into a closed storage
        self.storage.get_num_images()?;
        self.bus.post(&DataEvent::NewSummaryMetadata(Arc::new(metadata)));
        Ok(())
    }

    /// Remove an image, then announce the removal
    pub fn delete_image(&self, coords: &Coords) -> Result<()> {
        self.write_unless_frozen(|| self.storage.delete_image(coords))?;
        self.bus.post(&DataEvent::ImageDeleted {
            coords: coords.clone(),
        });
        Ok(())
    }

    /// Stop accepting writes. Freezing twice is a no-op.
    ///
    /// Waits for puts and deletes already past the frozen check; once this
    /// returns, every write it let through is in the storage. Their events
    /// may still be posted after [`DataEvent::Frozen`].
    pub fn freeze(&self) -> Result<()> {
        self.storage.freeze()?;
        let was_frozen = std::mem::replace(&mut *self.frozen.write(), true);
        if !was_frozen {
            info!(datastore = %self.id, "Froze datastore");
            self.bus.post(&DataEvent::Frozen);
        }
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        *self.frozen.read()
    }

    /// Close the storage and announce it. Later calls fail with [`StoreError::ClosedStore`].
    pub fn close(&self) -> Result<()> {
        self.storage.close()?;
        self.bus.post(&DataEvent::Closed);
        self.bus.unregister(self.storage_subscription);
        info!(datastore = %self.id, "Closed datastore");
        Ok(())
    }

    pub fn get_image(&self, coords: &Coords) -> Result<Option<Arc<Image>>> {
        self.storage.get_image(coords)
    }

    pub fn get_any_image(&self) -> Result<Option<Arc<Image>>> {
        self.storage.get_any_image()
    }

    pub fn get_images_matching(&self, coords: &Coords) -> Result<Vec<Arc<Image>>> {
        self.storage.get_images_matching(coords)
    }

    pub fn get_images_ignoring_axes(
        &self,
        coords: &Coords,
        ignore_axes: &[&str],
    ) -> Result<Vec<Arc<Image>>> {
        debug!(coords = %coords, ?ignore_axes, "Axis-elided lookup");
        self.storage.get_images_ignoring_axes(coords, ignore_axes)
    }

    pub fn get_unordered_image_coords(&self) -> Result<Vec<Coords>> {
        self.storage.get_unordered_image_coords()
    }

    pub fn has_image(&self, coords: &Coords) -> Result<bool> {
        self.storage.has_image(coords)
    }

    pub fn get_max_index(&self, axis: &str) -> Result<usize> {
        self.storage.get_max_index(axis)
    }

    pub fn get_max_indices(&self) -> Result<Coords> {
        self.storage.get_max_indices()
    }

    /// Number of positions along `axis`: one past the largest index, or 0 if unused.
    ///
    /// Fails with [`StoreError::IndexOverflow`] when the largest index is `usize::MAX`.
    pub fn get_next_index(&self, axis: &str) -> Result<usize> {
        match self.storage.get_max_indices()?.index(axis) {
            None => Ok(0),
            Some(max) => max.checked_add(1).ok_or_else(|| {
                StoreError::IndexOverflow(format!("no index after {} on axis {}", max, axis))
            }),
        }
    }

    pub fn get_axes(&self) -> Result<Vec<String>> {
        self.storage.get_axes()
    }

    pub fn axes_in_use(&self) -> Result<Vec<String>> {
        self.storage.axes_in_use()
    }

    pub fn get_summary_metadata(&self) -> Result<Arc<SummaryMetadata>> {
        self.storage.get_summary_metadata()
    }

    pub fn get_num_images(&self) -> Result<usize> {
        self.storage.get_num_images()
    }

    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }
}
