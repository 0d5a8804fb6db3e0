use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::iter::FusedIterator;

use crate::block_type::BlockType;
use crate::error::{Result, SchematicError};
use crate::position::{BlockPosition, WorldPoint};
use crate::world::WorldQuery;

/// Side of a region. North/South run along X, East/West along Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// -X
    North,
    /// +X
    South,
    /// -Z
    East,
    /// +Z
    West,
    /// -Y
    Down,
    /// +Y
    Up,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Down,
        Direction::Up,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
        }
    }

    /// Unit step pointing out of the region through this face.
    pub fn unit(self) -> BlockPosition {
        match self {
            Direction::North => BlockPosition::new(-1, 0, 0),
            Direction::South => BlockPosition::new(1, 0, 0),
            Direction::East => BlockPosition::new(0, 0, -1),
            Direction::West => BlockPosition::new(0, 0, 1),
            Direction::Down => BlockPosition::new(0, -1, 0),
            Direction::Up => BlockPosition::new(0, 1, 0),
        }
    }
}

/// Axes affected by [`Region::outset`] and [`Region::inset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisGroup {
    /// X and Z
    Horizontal,
    /// Y
    Vertical,
    Both,
}

/// Normalized axis-aligned box of voxels on a single world.
///
/// Bounds are inclusive, so a region always holds at least one voxel, and
/// `min <= max` holds on every axis. Every transform returns a new region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RegionBounds")]
pub struct Region {
    world_id: SmolStr,
    min: BlockPosition,
    max: BlockPosition,
}

#[derive(Deserialize)]
struct RegionBounds {
    world_id: SmolStr,
    min: BlockPosition,
    max: BlockPosition,
}

impl From<RegionBounds> for Region {
    fn from(bounds: RegionBounds) -> Self {
        Region::from_bounds(bounds.world_id, bounds.min, bounds.max)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region: {},{},{},{}=>{},{},{}",
            self.world_id, self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

impl Region {
    /// Region spanned by two corners, which must be on the same world.
    pub fn new(p1: &WorldPoint, p2: &WorldPoint) -> Result<Self> {
        if p1.world_id != p2.world_id {
            return Err(SchematicError::CrossWorld {
                first: p1.world_id.to_string(),
                second: p2.world_id.to_string(),
            });
        }
        Ok(Self::from_bounds(p1.world_id.clone(), p1.pos, p2.pos))
    }

    pub fn from_bounds(
        world_id: impl Into<SmolStr>,
        a: impl Into<BlockPosition>,
        b: impl Into<BlockPosition>,
    ) -> Self {
        let (a, b) = (a.into(), b.into());
        Self {
            world_id: world_id.into(),
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// One-voxel region.
    pub fn single(point: &WorldPoint) -> Self {
        Self::from_bounds(point.world_id.clone(), point.pos, point.pos)
    }

    fn with_bounds(&self, a: BlockPosition, b: BlockPosition) -> Self {
        Self::from_bounds(self.world_id.clone(), a, b)
    }

    pub fn world_id(&self) -> &str {
        &self.world_id
    }

    pub fn min(&self) -> BlockPosition {
        self.min
    }

    pub fn max(&self) -> BlockPosition {
        self.max
    }

    /// Voxels along X. A region spanning every i32 reports `u32::MAX`.
    pub fn size_x(&self) -> u32 {
        saturate(span(self.min.x, self.max.x))
    }

    pub fn size_y(&self) -> u32 {
        saturate(span(self.min.y, self.max.y))
    }

    pub fn size_z(&self) -> u32 {
        saturate(span(self.min.z, self.max.z))
    }

    pub fn dimensions(&self) -> (u32, u32, u32) {
        (self.size_x(), self.size_y(), self.size_z())
    }

    /// Exact voxel count, saturating at `u64::MAX`.
    pub fn volume(&self) -> u64 {
        let (x, y, z) = self.spans();
        x.saturating_mul(y).saturating_mul(z)
    }

    fn spans(&self) -> (u64, u64, u64) {
        (
            span(self.min.x, self.max.x),
            span(self.min.y, self.max.y),
            span(self.min.z, self.max.z),
        )
    }

    pub fn contains(&self, point: &WorldPoint) -> bool {
        point.world_id == self.world_id && self.contains_xyz(point.pos.x, point.pos.y, point.pos.z)
    }

    /// Bounds check that ignores the world.
    pub fn contains_xyz(&self, x: i32, y: i32, z: i32) -> bool {
        x >= self.min.x
            && x <= self.max.x
            && y >= self.min.y
            && y <= self.max.y
            && z >= self.min.z
            && z <= self.max.z
    }

    /// Move the face on the `direction` side outward by `amount`.
    ///
    /// A negative amount pulls the face in. Pulling it past the opposite face
    /// is allowed and re-normalizes the bounds.
    pub fn expand(&self, direction: Direction, amount: i32) -> Self {
        let (min, max) = (self.min, self.max);
        match direction {
            Direction::North => self.with_bounds(min.offset(-amount, 0, 0), max),
            Direction::South => self.with_bounds(min, max.offset(amount, 0, 0)),
            Direction::East => self.with_bounds(min.offset(0, 0, -amount), max),
            Direction::West => self.with_bounds(min, max.offset(0, 0, amount)),
            Direction::Down => self.with_bounds(min.offset(0, -amount, 0), max),
            Direction::Up => self.with_bounds(min, max.offset(0, amount, 0)),
        }
    }

    /// Translate by `amount` voxels towards `direction`.
    ///
    /// Grows the leading face before pulling in the trailing one so the
    /// intermediate region never inverts and re-normalizes.
    pub fn shift(&self, direction: Direction, amount: i32) -> Self {
        if amount >= 0 {
            self.expand(direction, amount)
                .expand(direction.opposite(), -amount)
        } else {
            self.expand(direction.opposite(), -amount)
                .expand(direction, amount)
        }
    }

    /// Grow both faces of every axis in `axes` by `amount`.
    pub fn outset(&self, axes: AxisGroup, amount: i32) -> Self {
        match axes {
            AxisGroup::Horizontal => self
                .expand(Direction::North, amount)
                .expand(Direction::South, amount)
                .expand(Direction::East, amount)
                .expand(Direction::West, amount),
            AxisGroup::Vertical => self
                .expand(Direction::Down, amount)
                .expand(Direction::Up, amount),
            AxisGroup::Both => self
                .outset(AxisGroup::Horizontal, amount)
                .outset(AxisGroup::Vertical, amount),
        }
    }

    pub fn inset(&self, axes: AxisGroup, amount: i32) -> Self {
        self.outset(axes, -amount)
    }

    /// The one-voxel-thick slab on the `direction` side.
    pub fn face(&self, direction: Direction) -> Self {
        let (min, max) = (self.min, self.max);
        match direction {
            Direction::North => self.with_bounds(min, BlockPosition::new(min.x, max.y, max.z)),
            Direction::South => self.with_bounds(BlockPosition::new(max.x, min.y, min.z), max),
            Direction::East => self.with_bounds(min, BlockPosition::new(max.x, max.y, min.z)),
            Direction::West => self.with_bounds(BlockPosition::new(min.x, min.y, max.z), max),
            Direction::Down => self.with_bounds(min, BlockPosition::new(max.x, min.y, max.z)),
            Direction::Up => self.with_bounds(BlockPosition::new(min.x, max.y, min.z), max),
        }
    }

    /// Smallest region holding both `self` and `other`.
    pub fn bounding_union(&self, other: Option<&Region>) -> Result<Self> {
        let Some(other) = other else {
            return Ok(self.clone());
        };
        if other.world_id != self.world_id {
            return Err(SchematicError::CrossWorld {
                first: self.world_id.to_string(),
                second: other.world_id.to_string(),
            });
        }
        Ok(self.with_bounds(self.min.min(other.min), self.max.max(other.max)))
    }

    /// Center of the region in fractional world coordinates.
    pub fn center(&self) -> (f64, f64, f64) {
        let mid = |lo: i32, hi: i32| lo as f64 + (hi as f64 + 1.0 - lo as f64) / 2.0;
        (
            mid(self.min.x, self.max.x),
            mid(self.min.y, self.max.y),
            mid(self.min.z, self.max.z),
        )
    }

    /// The eight corners, min corner first, X varying slowest.
    pub fn corners(&self) -> [BlockPosition; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            BlockPosition::new(lo.x, lo.y, lo.z),
            BlockPosition::new(lo.x, lo.y, hi.z),
            BlockPosition::new(lo.x, hi.y, lo.z),
            BlockPosition::new(lo.x, hi.y, hi.z),
            BlockPosition::new(hi.x, lo.y, lo.z),
            BlockPosition::new(hi.x, lo.y, hi.z),
            BlockPosition::new(hi.x, hi.y, lo.z),
            BlockPosition::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Chunk columns `(cx, cz)` touched by the region, for chunks of `1 << chunk_shift` voxels.
    ///
    /// Walks X-major, Z within each X.
    pub fn chunks(&self, chunk_shift: u32) -> impl Iterator<Item = (i32, i32)> {
        let shift = chunk_shift.min(31);
        let (x1, x2) = (self.min.x >> shift, self.max.x >> shift);
        let (z1, z2) = (self.min.z >> shift, self.max.z >> shift);
        (x1..=x2).flat_map(move |cx| (z1..=z2).map(move |cz| (cx, cz)))
    }

    /// Number of chunk columns [`chunks`](Self::chunks) yields.
    pub fn chunk_count(&self, chunk_shift: u32) -> u64 {
        let shift = chunk_shift.min(31);
        span(self.min.x >> shift, self.max.x >> shift)
            .saturating_mul(span(self.min.z >> shift, self.max.z >> shift))
    }

    /// Position `(x, y, z)` voxels from the min corner.
    pub fn relative(&self, x: i32, y: i32, z: i32) -> BlockPosition {
        self.min.offset(x, y, z)
    }

    pub fn iter(&self) -> RegionIter {
        RegionIter::new(self.min, self.spans())
    }

    pub fn for_each_point<F>(&self, mut f: F)
    where
        F: FnMut(BlockPosition),
    {
        for z in self.min.z..=self.max.z {
            for y in self.min.y..=self.max.y {
                for x in self.min.x..=self.max.x {
                    f(BlockPosition::new(x, y, z));
                }
            }
        }
    }

    /// True when every voxel in the region is `block`.
    pub fn is_uniform<Q>(&self, world: &Q, block: &BlockType) -> bool
    where
        Q: WorldQuery + ?Sized,
    {
        self.iter()
            .all(|pos| world.block_type_at(&self.world_id, pos) == *block)
    }

    /// Shrink to the smallest region whose every face holds a non-`empty` voxel.
    ///
    /// Directions are peeled in the order Down, South, East, Up, North, West.
    /// A region that is entirely `empty` collapses onto a single voxel corner.
    pub fn contract<Q>(&self, world: &Q, empty: &BlockType) -> Self
    where
        Q: WorldQuery + ?Sized,
    {
        self.contract_direction(Direction::Down, world, empty)
            .contract_direction(Direction::South, world, empty)
            .contract_direction(Direction::East, world, empty)
            .contract_direction(Direction::Up, world, empty)
            .contract_direction(Direction::North, world, empty)
            .contract_direction(Direction::West, world, empty)
    }

    /// Push the face opposite `direction` towards `direction` while it is all `empty`.
    ///
    /// `Down` lowers the top face, `Up` raises the bottom face, and so on.
    /// The face never moves past the far side of the region.
    pub fn contract_direction<Q>(&self, direction: Direction, world: &Q, empty: &BlockType) -> Self
    where
        Q: WorldQuery + ?Sized,
    {
        let mut face = self.face(direction.opposite());
        while face.is_uniform(world, empty) && self.face_can_advance(&face, direction) {
            face = face.shift(direction, 1);
        }

        let (min, max) = (self.min, self.max);
        match direction {
            Direction::Down => self.with_bounds(min, BlockPosition::new(max.x, face.max.y, max.z)),
            Direction::Up => self.with_bounds(BlockPosition::new(min.x, face.min.y, min.z), max),
            Direction::North => self.with_bounds(min, BlockPosition::new(face.max.x, max.y, max.z)),
            Direction::South => self.with_bounds(BlockPosition::new(face.min.x, min.y, min.z), max),
            Direction::East => self.with_bounds(min, BlockPosition::new(max.x, max.y, face.max.z)),
            Direction::West => self.with_bounds(BlockPosition::new(min.x, min.y, face.min.z), max),
        }
    }

    fn face_can_advance(&self, face: &Region, direction: Direction) -> bool {
        match direction {
            Direction::Down => face.min.y > self.min.y,
            Direction::Up => face.max.y < self.max.y,
            Direction::North => face.min.x > self.min.x,
            Direction::South => face.max.x < self.max.x,
            Direction::East => face.min.z > self.min.z,
            Direction::West => face.max.z < self.max.z,
        }
    }
}

/// Inclusive count of lattice values in `lo..=hi`, at most `2^32`.
fn span(lo: i32, hi: i32) -> u64 {
    (hi as i64 - lo as i64 + 1) as u64
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl<'a> IntoIterator for &'a Region {
    type Item = BlockPosition;
    type IntoIter = RegionIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy walk over every voxel of a region.
///
/// X varies fastest, then Y, then Z. Schematic files are written and replayed
/// in this order.
#[derive(Debug, Clone)]
pub struct RegionIter {
    base: BlockPosition,
    size: (i64, i64, i64),
    cursor: (i64, i64, i64),
    remaining: u64,
}

impl RegionIter {
    fn new(base: BlockPosition, spans: (u64, u64, u64)) -> Self {
        Self {
            base,
            size: (spans.0 as i64, spans.1 as i64, spans.2 as i64),
            cursor: (0, 0, 0),
            remaining: spans.0.saturating_mul(spans.1).saturating_mul(spans.2),
        }
    }
}

impl Iterator for RegionIter {
    type Item = BlockPosition;

    fn next(&mut self) -> Option<BlockPosition> {
        if self.remaining == 0 {
            return None;
        }
        let (x, y, z) = self.cursor;
        let pos = BlockPosition::new(
            (self.base.x as i64 + x) as i32,
            (self.base.y as i64 + y) as i32,
            (self.base.z as i64 + z) as i32,
        );

        self.cursor.0 += 1;
        if self.cursor.0 >= self.size.0 {
            self.cursor.0 = 0;
            self.cursor.1 += 1;
            if self.cursor.1 >= self.size.1 {
                self.cursor.1 = 0;
                self.cursor.2 += 1;
            }
        }
        self.remaining -= 1;
        Some(pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for RegionIter {}
