use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::PathsConfig;
use crate::domain::{Outcome, RankError, Result};

/// Persists trained models as JSON, one file per outcome.
///
/// Writes go to a temporary file first and are then rotated into place, keeping
/// the previous model as `<name>.bak`.
#[derive(Debug, Clone)]
pub struct ModelStore {
    book_path: PathBuf,
    click_path: PathBuf,
}

impl ModelStore {
    pub fn new(book_path: impl AsRef<Path>, click_path: impl AsRef<Path>) -> Self {
        Self {
            book_path: book_path.as_ref().to_path_buf(),
            click_path: click_path.as_ref().to_path_buf(),
        }
    }

    pub fn from_paths(paths: &PathsConfig) -> Self {
        Self::new(&paths.model_path_book, &paths.model_path_click)
    }

    pub fn path(&self, outcome: Outcome) -> &Path {
        match outcome {
            Outcome::Book => &self.book_path,
            Outcome::Click => &self.click_path,
        }
    }

    pub fn save<M: Serialize>(&self, model: &M, outcome: Outcome) -> Result<()> {
        let target = self.path(outcome);
        let payload = serde_json::to_vec(model)?;
        atomic_write(target, &payload)?;
        info!(
            "Saved {} model to {} ({} bytes)",
            outcome,
            target.display(),
            payload.len()
        );
        Ok(())
    }

    pub fn load<M: DeserializeOwned>(&self, outcome: Outcome) -> Result<M> {
        let source = self.path(outcome);
        if !source.exists() {
            return Err(RankError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no {} model at {}", outcome, source.display()),
            )));
        }
        let bytes = std::fs::read(source)?;
        let model = serde_json::from_slice(&bytes)?;
        debug!("Loaded {} model from {}", outcome, source.display());
        Ok(model)
    }
}

/// Write `payload` to `target` through a temp file, rotating the current file to `.bak`.
fn atomic_write(target: &Path, payload: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = target.with_extension("tmp");
    let backup_path = target.with_extension("bak");

    std::fs::write(&temp_path, payload)?;

    if target.exists() {
        if backup_path.exists() {
            std::fs::remove_file(&backup_path)?;
        }
        std::fs::rename(target, &backup_path)?;
    }

    std::fs::rename(&temp_path, target)?;
    Ok(())
}
