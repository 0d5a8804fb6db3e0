//! Save a small structure, paste it elsewhere, then destroy it again.
//!
//! Run with `RUST_LOG=debug cargo run --example paste_roundtrip`.

use schematic_system::{
    BlockPosition, BlockRegistry, BlockType, Location, MemoryWorld, SchematicConfig,
    SchematicService, Session, Slot, WorldPoint, WorldThread,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let registry = BlockRegistry::from_names(["Stone", "Wood", "Glass"]);
    let mut source = MemoryWorld::new(registry.clone());
    for x in 0..5 {
        for z in 0..5 {
            source.put("overworld", BlockPosition::new(x, 0, z), BlockType::new("Stone"));
            let wall = x == 0 || x == 4 || z == 0 || z == 4;
            if wall {
                source.put("overworld", BlockPosition::new(x, 1, z), BlockType::new("Wood"));
            }
        }
    }
    source.put("overworld", BlockPosition::new(2, 1, 0), BlockType::new("Glass"));

    let dir = std::env::temp_dir().join(format!("schematic-demo-{}", std::process::id()));
    let config = SchematicConfig::default().with_storage_dir(&dir);
    let world = Arc::new(WorldThread::spawn(MemoryWorld::new(registry))?);
    let service = SchematicService::new(config, world.clone())?;

    let mut session = Session::new();
    session.set_position("steve", Slot::First, WorldPoint::new("overworld", (0, 0, 0)));
    session.set_position("steve", Slot::Second, WorldPoint::new("overworld", (4, 3, 4)));
    let region = session.selected_region(&"steve")?;
    let tight = region.contract(&source, &BlockType::air());
    println!("selected {} ({} voxels), content fits in {}", region, region.volume(), tight);

    let standing = Location::new("overworld", 2.5, 0.0, 2.5);
    let records = service.save_selection(&session, &"steve", "hut", &standing, &source)?;
    println!("saved 'hut' with {} records", records);

    service.load_for(&mut session, "steve", "hut")?;
    let target = Location::new("overworld", 100.2, 64.0, -30.7);
    let pasted = service.paste_loaded(&session, &"steve", &target, |ok| {
        println!("paste finished: {}", ok);
    })?;
    pasted.wait();
    let placed = world.run(|w| w.count_non_default("overworld"))?;
    println!("{} blocks placed ({} skipped)", placed, pasted.skipped());

    let destroyed = service.destroy_loaded(&session, &"steve", &target, |ok| {
        println!("destroy finished: {}", ok);
    })?;
    destroyed.wait();
    let remaining = world.run(|w| w.count_non_default("overworld"))?;
    println!("{} blocks left after destroy", remaining);

    for stored in service.list()? {
        println!("{} ({} bytes)", stored.name, stored.size_bytes);
    }
    service.delete("hut");
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
