use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::block_type::BlockType;
use crate::error::{Result, SchematicError};
use crate::position::BlockPosition;

/// Read access to voxel content, supplied by the host.
pub trait WorldQuery {
    fn block_type_at(&self, world_id: &str, pos: BlockPosition) -> BlockType;
}

/// Write access to voxel content, supplied by the host.
///
/// Implementations resolve `block` against their own closed set of types and
/// report anything they cannot place as [`SchematicError::UnknownBlockType`].
pub trait WorldMutation {
    fn set_block(&mut self, world_id: &str, pos: BlockPosition, block: &BlockType) -> Result<()>;
}

/// Closed mapping from type ids to the host's concrete block representation.
#[derive(Debug, Clone)]
pub struct BlockRegistry<T> {
    entries: FxHashMap<SmolStr, T>,
}

impl<T> Default for BlockRegistry<T> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<T> BlockRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<SmolStr>, value: T) -> Option<T> {
        self.entries.insert(id.into(), value)
    }

    pub fn with(mut self, id: impl Into<SmolStr>, value: T) -> Self {
        self.register(id, value);
        self
    }

    pub fn resolve(&self, id: &str) -> Result<&T> {
        self.entries
            .get(id)
            .ok_or_else(|| SchematicError::UnknownBlockType {
                type_id: SmolStr::new(id),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BlockRegistry<BlockType> {
    /// Registry where every id resolves to a `BlockType` of the same name.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let mut registry = Self::new();
        for name in names {
            let name = name.into();
            registry.register(name.clone(), BlockType::new(name));
        }
        registry
    }
}

/// Sparse in-memory voxel store keyed by world and position.
///
/// Unset voxels read back as the default block. Writing the default block
/// removes the entry.
#[derive(Debug, Clone)]
pub struct MemoryWorld {
    blocks: FxHashMap<(SmolStr, BlockPosition), BlockType>,
    registry: BlockRegistry<BlockType>,
    default_block: BlockType,
    writes: usize,
}

impl MemoryWorld {
    pub fn new(registry: BlockRegistry<BlockType>) -> Self {
        let default_block = BlockType::air();
        let mut registry = registry;
        if !registry.contains(default_block.as_str()) {
            registry.register(default_block.as_str(), default_block.clone());
        }
        Self {
            blocks: FxHashMap::default(),
            registry,
            default_block,
            writes: 0,
        }
    }

    pub fn with_default_block(mut self, block: BlockType) -> Self {
        if !self.registry.contains(block.as_str()) {
            self.registry.register(block.as_str(), block.clone());
        }
        self.default_block = block;
        self
    }

    pub fn default_block(&self) -> &BlockType {
        &self.default_block
    }

    pub fn registry(&self) -> &BlockRegistry<BlockType> {
        &self.registry
    }

    /// Place a block without consulting the registry.
    pub fn put(&mut self, world_id: &str, pos: BlockPosition, block: BlockType) {
        let key = (SmolStr::new(world_id), pos);
        if block == self.default_block {
            self.blocks.remove(&key);
        } else {
            self.blocks.insert(key, block);
        }
    }

    pub fn get(&self, world_id: &str, pos: BlockPosition) -> &BlockType {
        self.blocks
            .get(&(SmolStr::new(world_id), pos))
            .unwrap_or(&self.default_block)
    }

    /// Number of non-default voxels in `world_id`.
    pub fn count_non_default(&self, world_id: &str) -> usize {
        self.blocks.keys().filter(|(w, _)| w == world_id).count()
    }

    /// Number of successful `set_block` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl WorldQuery for MemoryWorld {
    fn block_type_at(&self, world_id: &str, pos: BlockPosition) -> BlockType {
        self.get(world_id, pos).clone()
    }
}

impl WorldMutation for MemoryWorld {
    fn set_block(&mut self, world_id: &str, pos: BlockPosition, block: &BlockType) -> Result<()> {
        let resolved = self.registry.resolve(block.as_str())?.clone();
        self.put(world_id, pos, resolved);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_known_ids_only() {
        let registry = BlockRegistry::from_names(["Stone", "Wood"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("Stone").unwrap(), &BlockType::new("Stone"));
        match registry.resolve("Obsidian") {
            Err(SchematicError::UnknownBlockType { type_id }) => assert_eq!(type_id, "Obsidian"),
            other => panic!("expected UnknownBlockType, got {:?}", other),
        }
    }

    #[test]
    fn test_memory_world_defaults_to_air() {
        let world = MemoryWorld::new(BlockRegistry::from_names(["Stone"]));
        assert!(world.get("w", BlockPosition::new(5, 5, 5)).is_air());
        assert!(world.registry().contains("Air"));
    }

    #[test]
    fn test_memory_world_set_block() {
        let mut world = MemoryWorld::new(BlockRegistry::from_names(["Stone"]));
        let pos = BlockPosition::new(1, 2, 3);

        world.set_block("w", pos, &BlockType::new("Stone")).unwrap();
        assert_eq!(world.block_type_at("w", pos), BlockType::new("Stone"));
        assert!(world.block_type_at("other", pos).is_air());
        assert_eq!(world.count_non_default("w"), 1);

        assert!(world.set_block("w", pos, &BlockType::new("Lava")).is_err());
        assert_eq!(world.block_type_at("w", pos), BlockType::new("Stone"));

        world.set_block("w", pos, &BlockType::air()).unwrap();
        assert_eq!(world.count_non_default("w"), 0);
        assert_eq!(world.write_count(), 2);
    }
}
