//! Select a cuboid of blocks, save it as a relocatable schematic, and paste
//! or destroy it somewhere else without blocking the world.

pub mod block_type;
pub mod config;
pub mod error;
pub mod formats;
pub mod placement;
pub mod position;
pub mod region;
pub mod schematic;
pub mod service;
pub mod session;
pub mod store;
pub mod world;

pub use block_type::{BlockType, AIR, TYPE_DELIMITER};
pub use config::{LineEnding, NamePolicy, SchematicConfig};
pub use error::{Result, SchematicError};
pub use formats::BlockRecord;
pub use placement::{
    PlacementEngine, PlacementHandle, PlacementKind, PlacementState, SchematicSource,
    WorldExecutor, WorldJob, WorldThread,
};
pub use position::{BlockPosition, Location, WorldPoint};
pub use region::{AxisGroup, Direction, Region, RegionIter};
pub use schematic::Schematic;
pub use service::SchematicService;
pub use session::{PendingSelection, Session, Slot};
pub use store::{SchematicStore, StoredSchematic};
pub use world::{BlockRegistry, MemoryWorld, WorldMutation, WorldQuery};
