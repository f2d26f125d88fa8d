use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{MonitorError, MonitorResult};

/// Holds the id of the newest comment already forwarded.
pub trait CursorStore: Send + Sync {
    /// Absent, unreadable and corrupt state all read as `None`.
    fn load(&self) -> Option<String>;

    fn save(&self, id: &str) -> MonitorResult<()>;
}

#[derive(Debug, Clone)]
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cursor".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_atomically(&self, id: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(id.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)
    }
}

/// A cursor is a single non-empty token; anything else is treated as corrupt.
fn parse_cursor(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return None;
    }
    Some(trimmed.to_string())
}

impl CursorStore for FileCursorStore {
    fn load(&self) -> Option<String> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No cursor at {}; treating as first run", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Could not read cursor {}: {}", self.path.display(), e);
                return None;
            }
        };

        let cursor = std::str::from_utf8(&bytes).ok().and_then(parse_cursor);
        if cursor.is_none() {
            warn!("Ignoring corrupt cursor file {}", self.path.display());
        }
        cursor
    }

    fn save(&self, id: &str) -> MonitorResult<()> {
        if parse_cursor(id).as_deref() != Some(id) {
            return Err(MonitorError::PersistError(format!(
                "refusing to store malformed cursor {:?}",
                id
            )));
        }

        self.write_atomically(id).map_err(|e| {
            let _ = fs::remove_file(self.temp_path());
            MonitorError::PersistError(format!("{}: {}", self.path.display(), e))
        })?;

        info!("Cursor advanced to {} ({})", id, self.path.display());
        Ok(())
    }
}
