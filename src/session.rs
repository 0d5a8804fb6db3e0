use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{Result, SchematicError};
use crate::position::WorldPoint;
use crate::region::Region;
use crate::schematic::Schematic;

/// Which corner of a pending selection to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    pub fn number(self) -> u8 {
        match self {
            Slot::First => 1,
            Slot::Second => 2,
        }
    }
}

impl TryFrom<u8> for Slot {
    type Error = SchematicError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Slot::First),
            2 => Ok(Slot::Second),
            other => Err(SchematicError::InvalidSlot(other)),
        }
    }
}

/// Two corners an actor is marking out. Either may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSelection {
    pub pos1: Option<WorldPoint>,
    pub pos2: Option<WorldPoint>,
}

impl PendingSelection {
    pub fn set(&mut self, slot: Slot, point: WorldPoint) {
        match slot {
            Slot::First => self.pos1 = Some(point),
            Slot::Second => self.pos2 = Some(point),
        }
    }

    pub fn get(&self, slot: Slot) -> Option<&WorldPoint> {
        match slot {
            Slot::First => self.pos1.as_ref(),
            Slot::Second => self.pos2.as_ref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pos1.is_some() && self.pos2.is_some()
    }

    pub fn region(&self) -> Result<Region> {
        let pos1 = self
            .pos1
            .as_ref()
            .ok_or(SchematicError::IncompleteSelection { slot: 1 })?;
        let pos2 = self
            .pos2
            .as_ref()
            .ok_or(SchematicError::IncompleteSelection { slot: 2 })?;
        Region::new(pos1, pos2)
    }
}

/// Per-actor state owned by the command layer: pending selections and the
/// schematic each actor last loaded.
///
/// Loading again replaces the previous schematic for that actor.
#[derive(Debug)]
pub struct Session<A> {
    selections: FxHashMap<A, PendingSelection>,
    loaded: FxHashMap<A, Arc<Schematic>>,
}

impl<A> Default for Session<A> {
    fn default() -> Self {
        Self {
            selections: FxHashMap::default(),
            loaded: FxHashMap::default(),
        }
    }
}

impl<A: Eq + Hash> Session<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&mut self, actor: A, slot: Slot, point: WorldPoint) {
        self.selections.entry(actor).or_default().set(slot, point);
    }

    pub fn selection(&self, actor: &A) -> Option<&PendingSelection> {
        self.selections.get(actor)
    }

    /// Region between the actor's two corners.
    pub fn selected_region(&self, actor: &A) -> Result<Region> {
        match self.selections.get(actor) {
            Some(selection) => selection.region(),
            None => Err(SchematicError::IncompleteSelection { slot: 1 }),
        }
    }

    /// Cache `schematic` for `actor`, returning whatever it replaced.
    pub fn set_loaded(&mut self, actor: A, schematic: Arc<Schematic>) -> Option<Arc<Schematic>> {
        self.loaded.insert(actor, schematic)
    }

    pub fn loaded(&self, actor: &A) -> Option<Arc<Schematic>> {
        self.loaded.get(actor).cloned()
    }

    /// Drop everything held for `actor`.
    pub fn forget(&mut self, actor: &A) {
        self.selections.remove(actor);
        self.loaded.remove(actor);
    }
}
