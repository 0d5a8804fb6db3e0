use std::hash::Hash;
use std::sync::Arc;

use crate::config::SchematicConfig;
use crate::error::{Result, SchematicError};
use crate::placement::{PlacementEngine, PlacementHandle, SchematicSource, WorldExecutor};
use crate::position::{BlockPosition, Location, WorldPoint};
use crate::region::Region;
use crate::schematic::Schematic;
use crate::session::Session;
use crate::store::{SchematicStore, StoredSchematic};
use crate::world::WorldQuery;

/// Entry points for the command layer: save, load, paste, destroy, delete.
///
/// Holds no per-actor state; pass a [`Session`] to the actor-aware calls.
pub struct SchematicService {
    config: SchematicConfig,
    engine: PlacementEngine,
}

impl SchematicService {
    pub fn new(config: SchematicConfig, executor: Arc<dyn WorldExecutor>) -> Result<Self> {
        let engine = PlacementEngine::new(&config, executor)?;
        tracing::info!(
            storage_dir = %config.storage_dir.display(),
            reader_threads = config.reader_threads,
            "schematic service ready"
        );
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &SchematicConfig {
        &self.config
    }

    pub fn store(&self) -> &SchematicStore {
        self.engine.store()
    }

    pub fn engine(&self) -> &PlacementEngine {
        &self.engine
    }

    /// Capture `region` relative to `anchor` and store it under `name`.
    /// Returns the number of records written.
    pub fn save<Q>(&self, name: &str, region: &Region, anchor: BlockPosition, world: &Q) -> Result<usize>
    where
        Q: WorldQuery + ?Sized,
    {
        if self.store().exists(name) {
            return Err(SchematicError::AlreadyExists(name.to_string()));
        }
        let schematic = Schematic::capture(world, region, anchor)?;
        let lines = schematic.to_lines()?;
        self.store().save(name, &lines)?;
        tracing::info!(name, %region, anchor = %anchor, records = lines.len(), "saved schematic");
        Ok(lines.len())
    }

    /// Save the actor's selection, anchored at the cell they stand in.
    pub fn save_selection<A, Q>(
        &self,
        session: &Session<A>,
        actor: &A,
        name: &str,
        location: &Location,
        world: &Q,
    ) -> Result<usize>
    where
        A: Eq + Hash,
        Q: WorldQuery + ?Sized,
    {
        let region = session.selected_region(actor)?;
        if region.world_id() != location.world_id.as_str() {
            return Err(SchematicError::CrossWorld {
                first: region.world_id().to_string(),
                second: location.world_id.to_string(),
            });
        }
        self.save(name, &region, location.block(), world)
    }

    /// Read and decode a stored schematic.
    pub fn load(&self, name: &str) -> Result<Arc<Schematic>> {
        let lines = self.store().load(name)?;
        if lines.is_empty() {
            return Err(SchematicError::EmptySchematic(name.to_string()));
        }
        let schematic = Schematic::from_lines(&lines)?;
        tracing::debug!(name, records = schematic.len(), "decoded schematic");
        Ok(Arc::new(schematic))
    }

    /// Load `name` into the actor's slot, replacing anything loaded before.
    /// Returns the record count.
    pub fn load_for<A>(&self, session: &mut Session<A>, actor: A, name: &str) -> Result<usize>
    where
        A: Eq + Hash,
    {
        let schematic = self.load(name)?;
        let records = schematic.len();
        if session.set_loaded(actor, schematic).is_some() {
            tracing::debug!(name, "replaced previously loaded schematic");
        }
        Ok(records)
    }

    pub fn paste<F>(&self, anchor: WorldPoint, source: SchematicSource, on_done: F) -> PlacementHandle
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.engine.paste(anchor, source, on_done)
    }

    pub fn destroy<F>(&self, anchor: WorldPoint, source: SchematicSource, on_done: F) -> PlacementHandle
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.engine.destroy(anchor, source, on_done)
    }

    /// Paste whatever the actor last loaded at the cell they stand in.
    pub fn paste_loaded<A, F>(
        &self,
        session: &Session<A>,
        actor: &A,
        location: &Location,
        on_done: F,
    ) -> Result<PlacementHandle>
    where
        A: Eq + Hash,
        F: FnOnce(bool) + Send + 'static,
    {
        let schematic = session.loaded(actor).ok_or(SchematicError::NothingLoaded)?;
        Ok(self.paste(
            location.to_world_point(),
            SchematicSource::Loaded(schematic),
            on_done,
        ))
    }

    /// Clear the footprint of whatever the actor last loaded.
    pub fn destroy_loaded<A, F>(
        &self,
        session: &Session<A>,
        actor: &A,
        location: &Location,
        on_done: F,
    ) -> Result<PlacementHandle>
    where
        A: Eq + Hash,
        F: FnOnce(bool) + Send + 'static,
    {
        let schematic = session.loaded(actor).ok_or(SchematicError::NothingLoaded)?;
        Ok(self.destroy(
            location.to_world_point(),
            SchematicSource::Loaded(schematic),
            on_done,
        ))
    }

    /// Remove a stored schematic. `false` when there was nothing to remove.
    pub fn delete(&self, name: &str) -> bool {
        match self.store().delete(name) {
            Ok(()) => {
                tracing::info!(name, "deleted schematic");
                true
            }
            Err(SchematicError::NotFound(_)) => false,
            Err(e) => {
                tracing::warn!(name, error = %e, "could not delete schematic");
                false
            }
        }
    }

    pub fn list(&self) -> Result<Vec<StoredSchematic>> {
        self.store().list()
    }
}
