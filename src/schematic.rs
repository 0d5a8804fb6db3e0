use serde::{Deserialize, Serialize};

use crate::block_type::BlockType;
use crate::error::{Result, SchematicError};
use crate::formats::lines::{self, BlockRecord};
use crate::position::BlockPosition;
use crate::region::Region;
use crate::world::WorldQuery;

/// Ordered block records captured relative to an anchor.
///
/// Records keep the region's enumeration order. Capture is dense: empty
/// voxels are stored like any other block, so a captured schematic has one
/// record per voxel of the source region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schematic {
    records: Vec<BlockRecord>,
}

impl Schematic {
    pub fn new(records: Vec<BlockRecord>) -> Self {
        Self { records }
    }

    /// Read every voxel of `region` from `world`, offset against `anchor`.
    pub fn capture<Q>(world: &Q, region: &Region, anchor: BlockPosition) -> Result<Self>
    where
        Q: WorldQuery + ?Sized,
    {
        let records = region
            .iter()
            .map(|pos| {
                BlockRecord::relative_to(pos, anchor, world.block_type_at(region.world_id(), pos))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { records })
    }

    pub fn from_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            records: lines::decode(lines)?,
        })
    }

    pub fn to_lines(&self) -> Result<Vec<String>> {
        self.records.iter().map(BlockRecord::to_line).collect()
    }

    pub fn records(&self) -> &[BlockRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Absolute target and block type of every record when placed at `anchor`.
    pub fn placements(
        &self,
        anchor: BlockPosition,
    ) -> impl Iterator<Item = Result<(BlockPosition, &BlockType)>> + '_ {
        self.records
            .iter()
            .map(move |record| Ok((record.target(anchor)?, &record.block)))
    }

    /// Min and max offsets over all records.
    pub fn bounds(&self) -> Option<(BlockPosition, BlockPosition)> {
        let first = self.records.first()?.offset;
        Some(
            self.records
                .iter()
                .fold((first, first), |(lo, hi), r| (lo.min(r.offset), hi.max(r.offset))),
        )
    }

    /// The region a paste at `anchor` on `world_id` would write to, `None` when empty.
    pub fn footprint(&self, world_id: &str, anchor: BlockPosition) -> Result<Option<Region>> {
        let Some((lo, hi)) = self.bounds() else {
            return Ok(None);
        };
        let overflow = |offset| SchematicError::CoordinateOverflow {
            base: anchor,
            offset,
        };
        let lo = anchor.checked_add(lo).ok_or_else(|| overflow(lo))?;
        let hi = anchor.checked_add(hi).ok_or_else(|| overflow(hi))?;
        Ok(Some(Region::from_bounds(world_id, lo, hi)))
    }

    pub fn count_non_default(&self, default_block: &BlockType) -> usize {
        self.records
            .iter()
            .filter(|r| r.block != *default_block)
            .count()
    }
}

impl FromIterator<BlockRecord> for Schematic {
    fn from_iter<T: IntoIterator<Item = BlockRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
