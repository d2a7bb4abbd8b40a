//! coordstore - coordinate-indexed image storage
//!
//! In-memory storage for multi-dimensional scientific image data. Every
//! image is addressed by a [`Coords`] (named axis indices such as time,
//! channel, z-slice and stage position) instead of a linear offset.
//!
//! # Features
//!
//! - Exact and axis-elided lookups ("every z-slice at this time point")
//! - Per-axis maximum index tracking for sizing display grids
//! - Size/format consistency checks on insert
//! - Priority-ordered event bus; images are stored before they are announced
//! - Explicit open/closed lifecycle
//!
//! # Example
//!
//! ```rust
//! use coordstore::{Coords, Datastore, Image, ImageFormat, StorageConfig};
//!
//! # fn example() -> coordstore::Result<()> {
//! let store = Datastore::new_ram(StorageConfig::default());
//! let format = ImageFormat::gray(512, 512, 2);
//!
//! for z in 0..3 {
//!     let coords = Coords::builder().t(0).z(z).build();
//!     store.put_image(Image::new(coords, format, vec![0u8; format.size_in_bytes()]))?;
//! }
//!
//! let stack = store.get_images_ignoring_axes(&Coords::builder().t(0).build(), &["z"])?;
//! assert_eq!(stack.len(), 3);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod config;
pub mod coords;
pub mod datastore;
pub mod error;
pub mod events;
pub mod image;
pub mod metadata;
pub mod storage;
pub mod utils;

// Re-exports
pub use config::{AnyImageCache, StorageConfig};
pub use coords::{Coords, CoordsBuilder};
pub use datastore::Datastore;
pub use error::{Result, StoreError};
pub use events::{DataEvent, DataEventListener, EventBus, SubscriptionId};
pub use image::{Image, ImageFormat};
pub use metadata::SummaryMetadata;
pub use storage::{ImageStorage, RewritableStorage, StorageRam, StorageStats};

/// Version of the coordstore crate
pub const COORDSTORE_VERSION: &str = env!("CARGO_PKG_VERSION");
