use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

use crate::error::{Result, SchematicError};

/// Separates the fields of an encoded block record. Never valid inside a type id.
pub const TYPE_DELIMITER: char = '~';

/// Name of the block type used for empty voxels.
pub const AIR: &str = "Air";

/// Opaque block material identifier, e.g. `"Stone"` or `"Wood"`.
///
/// The crate never interprets the contents; meaning is deferred to whatever
/// `WorldMutation` receives it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockType {
    id: SmolStr,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Default for BlockType {
    fn default() -> Self {
        Self::air()
    }
}

impl From<&str> for BlockType {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BlockType {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl BlockType {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        BlockType { id: id.into() }
    }

    /// Build a type id, rejecting ids that could not survive encoding.
    pub fn parse(id: impl Into<SmolStr>) -> Result<Self> {
        let block = Self::new(id);
        block.validate()?;
        Ok(block)
    }

    pub fn air() -> Self {
        Self::new(AIR)
    }

    pub fn as_str(&self) -> &str {
        self.id.as_str()
    }

    pub fn is_air(&self) -> bool {
        self.id == AIR
    }

    pub fn is_valid_id(id: &str) -> bool {
        !id.is_empty() && !id.contains(TYPE_DELIMITER) && !id.contains(['\n', '\r'])
    }

    pub fn validate(&self) -> Result<()> {
        if Self::is_valid_id(&self.id) {
            Ok(())
        } else {
            Err(SchematicError::InvalidTypeId(self.id.to_string()))
        }
    }
}
