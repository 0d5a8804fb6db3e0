use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::block_type::BlockType;
use crate::error::{Result, SchematicError};

/// Line terminator written after every record. Reading accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Platform,
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Platform => {
                if cfg!(windows) {
                    "\r\n"
                } else {
                    "\n"
                }
            }
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// How schematic names are vetted before they become file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamePolicy {
    /// Names are used verbatim, path separators included.
    #[default]
    Permissive,
    /// Names must be a single non-empty path component.
    Strict,
}

impl NamePolicy {
    pub fn check(self, name: &str) -> Result<()> {
        match self {
            NamePolicy::Permissive => Ok(()),
            NamePolicy::Strict => {
                let bad = name.is_empty()
                    || name == "."
                    || name == ".."
                    || name.contains(['/', '\\', '\0'])
                    || name.contains(':');
                if bad {
                    Err(SchematicError::InvalidName(name.to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Settings for storage and placement, loadable from JSON.
///
/// ```json
/// { "storage_dir": "plugins/schematics", "line_ending": "lf", "name_policy": "strict" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchematicConfig {
    pub storage_dir: PathBuf,
    pub extension: String,
    pub line_ending: LineEnding,
    pub name_policy: NamePolicy,
    /// Block written by destroy and treated as empty by contraction.
    pub default_block: BlockType,
    /// Threads in the background pool that reads schematics.
    pub reader_threads: usize,
}

impl Default for SchematicConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("schematics"),
            extension: "schematic".to_string(),
            line_ending: LineEnding::Platform,
            name_policy: NamePolicy::Permissive,
            default_block: BlockType::air(),
            reader_threads: 1,
        }
    }
}

impl SchematicConfig {
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SchematicConfig = serde_json::from_str(json)?;
        config.default_block.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
