use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::{LineEnding, NamePolicy, SchematicConfig};
use crate::error::{Result, SchematicError};

/// A schematic file found by [`SchematicStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredSchematic {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Directory of `{name}.{extension}` text files, one schematic per file.
///
/// The directory is created on first write. There is no in-process locking;
/// each name is guarded only by the exclusive create in [`save`](Self::save).
#[derive(Debug, Clone)]
pub struct SchematicStore {
    root: PathBuf,
    extension: String,
    line_ending: LineEnding,
    name_policy: NamePolicy,
}

impl SchematicStore {
    pub fn new(config: &SchematicConfig) -> Self {
        Self {
            root: config.storage_dir.clone(),
            extension: config.extension.clone(),
            line_ending: config.line_ending,
            name_policy: config.name_policy,
        }
    }

    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::new(&SchematicConfig::default().with_storage_dir(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, self.extension))
    }

    fn ensure_root(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
            tracing::debug!(root = %self.root.display(), "created schematic directory");
        }
        Ok(())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.name_policy.check(name).is_ok() && self.path_for(name).is_file()
    }

    /// Write `lines` under a new name. Never overwrites an existing schematic.
    pub fn save<S: AsRef<str>>(&self, name: &str, lines: &[S]) -> Result<()> {
        self.name_policy.check(name)?;
        self.ensure_root()?;

        let path = self.path_for(name);
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SchematicError::AlreadyExists(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.write_lines(file, lines) {
            tracing::warn!(name, error = %e, "failed to write schematic, removing partial file");
            if let Err(remove_err) = fs::remove_file(&path) {
                tracing::warn!(name, error = %remove_err, "could not remove partial schematic");
            }
            return Err(e.into());
        }

        tracing::debug!(name, lines = lines.len(), path = %path.display(), "saved schematic");
        Ok(())
    }

    fn write_lines<S: AsRef<str>>(&self, file: fs::File, lines: &[S]) -> std::io::Result<()> {
        let newline = self.line_ending.as_str();
        let mut writer = BufWriter::new(file);
        for line in lines {
            writer.write_all(line.as_ref().as_bytes())?;
            writer.write_all(newline.as_bytes())?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }

    /// Read the raw lines of a schematic, `\n` and `\r\n` alike.
    pub fn load(&self, name: &str) -> Result<Vec<String>> {
        self.name_policy.check(name)?;
        let path = self.path_for(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SchematicError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        tracing::debug!(name, lines = lines.len(), "loaded schematic");
        Ok(lines)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.name_policy.check(name)?;
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => {
                tracing::debug!(name, "deleted schematic");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SchematicError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every schematic in the directory, sorted by name.
    pub fn list(&self) -> Result<Vec<StoredSchematic>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let matches_extension = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == self.extension)
                .unwrap_or(false);
            if !matches_extension || !path.is_file() {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let metadata = fs::metadata(&path)?;
            found.push(StoredSchematic {
                name: name.to_string(),
                size_bytes: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                path: path.clone(),
            });
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}
