use smol_str::SmolStr;

use crate::position::BlockPosition;

/// Error type for selection, storage and placement operations.
#[derive(Debug, thiserror::Error)]
pub enum SchematicError {
    #[error("Points are in different worlds: '{first}' and '{second}'")]
    CrossWorld { first: String, second: String },
    #[error("Selection is incomplete: position {slot} is not set")]
    IncompleteSelection { slot: u8 },
    #[error("Invalid selection slot {0}, expected 1 or 2")]
    InvalidSlot(u8),
    #[error("Schematic '{0}' already exists")]
    AlreadyExists(String),
    #[error("Schematic '{0}' not found")]
    NotFound(String),
    #[error("Schematic '{0}' is empty")]
    EmptySchematic(String),
    #[error("Invalid schematic name '{0}'")]
    InvalidName(String),
    #[error("Malformed schematic line {line_number}: '{line}'")]
    MalformedLine { line_number: usize, line: String },
    #[error("Invalid block type id '{0}'")]
    InvalidTypeId(String),
    #[error("Coordinate out of range combining {base} and {offset}")]
    CoordinateOverflow {
        base: BlockPosition,
        offset: BlockPosition,
    },
    #[error("Unknown block type '{type_id}'")]
    UnknownBlockType { type_id: SmolStr },
    #[error("No schematic loaded")]
    NothingLoaded,
    #[error("World executor has shut down")]
    EngineStopped,
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SchematicError>;
