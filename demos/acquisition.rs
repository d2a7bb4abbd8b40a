//! Example: Simulated multi-channel z-stack acquisition with a live display consumer
//!
//! Run with: RUST_LOG=coordstore=debug cargo run --example acquisition

use coordstore::{
    coords::{CHANNEL, T, Z},
    events::DEFAULT_PRIORITY,
    Coords, DataEvent, Datastore, Image, ImageFormat, StorageConfig, SummaryMetadata,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

const TIME_POINTS: usize = 5;
const CHANNELS: usize = 2;
const SLICES: usize = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("coordstore Example: Live Acquisition");
    println!("====================================\n");

    let store = Arc::new(Datastore::new_ram(StorageConfig::default()));
    store.set_summary_metadata(
        SummaryMetadata::new([T, CHANNEL, Z])
            .with_prefix("demo")
            .with_channel_names(["DAPI", "GFP"])
            .with_z_step_um(0.5)
            .started_now(),
    )?;
    println!("Datastore {} created", store.id());
    println!("Declared axes: {:?}\n", store.get_axes()?);

    // The display redraws a channel's full z-stack whenever its last slice lands
    let redraws = Arc::new(AtomicUsize::new(0));
    let display_store = Arc::clone(&store);
    let display_redraws = Arc::clone(&redraws);
    store.register_listener(
        Arc::new(move |event: &DataEvent| {
            let DataEvent::NewImage { coords } = event else {
                return;
            };
            if coords.index(Z) != Some(SLICES - 1) {
                return;
            }
            let stack_key = coords.copy_removing_axes(&[Z]);
            match display_store.get_images_ignoring_axes(&stack_key, &[Z]) {
                Ok(stack) => {
                    display_redraws.fetch_add(1, Ordering::Relaxed);
                    println!("  display: {} -> {} slices", stack_key, stack.len());
                }
                Err(err) => eprintln!("  display: {}", err),
            }
        }),
        DEFAULT_PRIORITY,
    );

    let format = ImageFormat::gray(512, 512, 2);
    let producers: Vec<_> = (0..CHANNELS)
        .map(|channel| {
            let store = Arc::clone(&store);
            thread::spawn(move || -> coordstore::Result<()> {
                for t in 0..TIME_POINTS {
                    for z in 0..SLICES {
                        let coords = Coords::builder().t(t).channel(channel).z(z).build();
                        let pixels = vec![(z * 10) as u8; format.size_in_bytes()];
                        store.put_image(Image::new(coords, format, pixels))?;
                    }
                }
                Ok(())
            })
        })
        .collect();

    for producer in producers {
        producer
            .join()
            .map_err(|_| "producer thread panicked")??;
    }
    store.freeze()?;

    println!();
    println!("Acquired:    {}", store.stats()?.summary());
    println!("Redraws:     {}", redraws.load(Ordering::Relaxed));
    println!(
        "Next index:  t={} c={} z={}",
        store.get_next_index(T)?,
        store.get_next_index(CHANNEL)?,
        store.get_next_index(Z)?,
    );

    // An export pass walks every stored coordinate
    let coords = store.get_unordered_image_coords()?;
    let bytes: usize = coords
        .iter()
        .filter_map(|c| store.get_image(c).ok().flatten())
        .map(|image| image.pixels().len())
        .sum();
    println!("Exported:    {} images, {} bytes", coords.len(), bytes);

    store.close()?;
    println!("\n✓ Datastore closed");

    Ok(())
}
