//! End-to-end tests of the datastore as display and export pipelines use it
//!
//! A producer writes images while consumers react to events and read the
//! images back through the public API.

use coordstore::{
    coords::{CHANNEL, STAGE_POSITION, T, Z},
    events::DEFAULT_PRIORITY,
    AnyImageCache, Coords, DataEvent, Datastore, Image, ImageFormat, StorageConfig, StoreError,
    SummaryMetadata,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn format() -> ImageFormat {
    ImageFormat::gray(16, 16, 2)
}

fn image(coords: Coords, tag: &str) -> Image {
    Image::new(coords, format(), vec![0u8; format().size_in_bytes()]).with_metadata("tag", tag)
}

fn tz(t: usize, z: usize) -> Coords {
    Coords::builder().t(t).z(z).build()
}

#[test]
fn test_scenario_max_index_and_count() {
    let store = Datastore::new_ram(StorageConfig::default());
    store.put_image(image(tz(0, 0), "a")).unwrap();
    store.put_image(image(tz(0, 1), "b")).unwrap();

    assert_eq!(store.get_max_index(Z).unwrap(), 1);
    assert_eq!(store.get_num_images().unwrap(), 2);
}

#[test]
fn test_scenario_overwrite() {
    let store = Datastore::new_ram(StorageConfig::default());
    let coords = Coords::builder().t(0).build();
    store.put_image(image(coords.clone(), "first")).unwrap();
    store.put_image(image(coords.clone(), "second")).unwrap();

    assert_eq!(store.get_num_images().unwrap(), 1);
    let stored = store.get_image(&coords).unwrap().unwrap();
    assert_eq!(stored.get_metadata("tag"), Some("second"));
}

#[test]
fn test_scenario_z_stack_query() {
    let store = Datastore::new_ram(StorageConfig::default());
    for z in 0..3 {
        store.put_image(image(tz(0, z), "slice")).unwrap();
    }

    let stack = store
        .get_images_ignoring_axes(&Coords::builder().t(0).build(), &[Z])
        .unwrap();
    assert_eq!(stack.len(), 3);
}

#[test]
fn test_scenario_delete_missing() {
    let store = Datastore::new_ram(StorageConfig::default());
    let coords = Coords::builder().t(5).build();
    assert_eq!(
        store.delete_image(&coords),
        Err(StoreError::NotFound(coords.clone()))
    );
    assert!(store.get_image(&coords).unwrap().is_none());
}

#[test]
fn test_scenario_any_image_after_delete() {
    let coords = Coords::builder().t(0).build();

    let invalidating = Datastore::new_ram(StorageConfig::default());
    invalidating.put_image(image(coords.clone(), "A")).unwrap();
    assert_eq!(
        invalidating
            .get_any_image()
            .unwrap()
            .unwrap()
            .get_metadata("tag"),
        Some("A")
    );
    invalidating.delete_image(&coords).unwrap();
    assert!(invalidating.get_any_image().unwrap().is_none());

    let sticky = Datastore::new_ram(
        StorageConfig::default().with_any_image_cache(AnyImageCache::Sticky),
    );
    sticky.put_image(image(coords.clone(), "A")).unwrap();
    sticky.get_any_image().unwrap();
    sticky.delete_image(&coords).unwrap();
    assert_eq!(
        sticky.get_any_image().unwrap().unwrap().get_metadata("tag"),
        Some("A")
    );
}

#[test]
fn test_scenario_size_mismatch() {
    let store = Datastore::new_ram(StorageConfig::default());
    let big = ImageFormat::gray(512, 512, 2);
    let small = ImageFormat::gray(256, 256, 2);
    store
        .put_image(Image::new(tz(0, 0), big, vec![0u8; big.size_in_bytes()]))
        .unwrap();

    let before = store.get_unordered_image_coords().unwrap();
    let result = store.put_image(Image::new(tz(0, 1), small, vec![0u8; small.size_in_bytes()]));
    assert!(matches!(result, Err(StoreError::SizeMismatch { .. })));
    assert_eq!(store.get_unordered_image_coords().unwrap(), before);
    assert_eq!(store.get_max_index(Z).unwrap(), 0);
}

#[test]
fn test_axes_from_metadata_may_diverge() {
    let store = Datastore::new_ram(StorageConfig::default());
    store
        .set_summary_metadata(SummaryMetadata::new([T, CHANNEL, Z]).with_prefix("run"))
        .unwrap();
    store
        .put_image(image(Coords::builder().t(0).stage_position(2).build(), "p"))
        .unwrap();

    assert_eq!(store.get_axes().unwrap(), vec![T, CHANNEL, Z]);
    assert_eq!(store.axes_in_use().unwrap(), vec![STAGE_POSITION, T]);
    assert_eq!(
        store.get_summary_metadata().unwrap().prefix.as_deref(),
        Some("run")
    );
}

#[test]
fn test_display_consumer_sees_every_image() {
    let store = Arc::new(Datastore::new_ram(StorageConfig::default()));
    let displayed = Arc::new(Mutex::new(Vec::new()));

    let reader = Arc::clone(&store);
    let sink = Arc::clone(&displayed);
    store.register_listener(
        Arc::new(move |event: &DataEvent| {
            if let DataEvent::NewImage { coords } = event {
                let t = coords.index(T).unwrap_or(0);
                // a display redraws the whole z-stack for the new time point
                let stack = reader
                    .get_images_ignoring_axes(&Coords::builder().t(t).build(), &[Z])
                    .unwrap();
                assert!(stack.iter().any(|image| image.coords() == coords));
                sink.lock().push(coords.clone());
            }
        }),
        DEFAULT_PRIORITY,
    );

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for z in 0..25 {
                    store.put_image(image(tz(t, z), "live")).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let displayed: HashSet<_> = displayed.lock().iter().cloned().collect();
    assert_eq!(displayed.len(), 100);
    assert_eq!(store.get_num_images().unwrap(), 100);
    assert_eq!(store.get_next_index(T).unwrap(), 4);
    assert_eq!(store.get_next_index(Z).unwrap(), 25);
}

#[test]
fn test_export_after_freeze() {
    let store = Datastore::new_ram(StorageConfig::default());
    for t in 0..2 {
        for c in 0..2 {
            let coords = Coords::builder().t(t).channel(c).build();
            store.put_image(image(coords, "export")).unwrap();
        }
    }
    store.freeze().unwrap();

    // an exporter walks the coordinate snapshot
    let mut exported = 0;
    for coords in store.get_unordered_image_coords().unwrap() {
        let image = store.get_image(&coords).unwrap().unwrap();
        assert_eq!(image.format(), format());
        exported += 1;
    }
    assert_eq!(exported, 4);

    let per_channel = store
        .get_images_ignoring_axes(&Coords::builder().channel(1).build(), &[T])
        .unwrap();
    assert_eq!(per_channel.len(), 2);

    assert_eq!(
        store.put_image(image(tz(9, 9), "late")),
        Err(StoreError::Frozen)
    );
}

#[test]
fn test_closed_datastore() {
    let store = Datastore::new_ram(StorageConfig::default());
    store.put_image(image(tz(0, 0), "a")).unwrap();
    store.close().unwrap();

    assert_eq!(store.get_image(&tz(0, 0)), Err(StoreError::ClosedStore));
    assert_eq!(store.get_any_image(), Err(StoreError::ClosedStore));
    assert_eq!(store.put_image(image(tz(0, 1), "b")), Err(StoreError::ClosedStore));
    assert_eq!(store.delete_image(&tz(0, 0)), Err(StoreError::ClosedStore));
    assert_eq!(store.freeze(), Err(StoreError::ClosedStore));
}
