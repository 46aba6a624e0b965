pub mod activity;
pub mod apply;
pub mod init;
pub mod inspect;
pub mod validate;

pub use activity::{activity, ActivityArgs};
pub use apply::{apply, ApplyArgs};
pub use init::{init, InitArgs};
pub use inspect::{inspect, InspectArgs};
pub use validate::{validate, ValidateArgs};

use anyhow::{Context, Result};
use quire_editor::{import_story, ImportError, Story};
use std::path::{Path, PathBuf};

/// Resolve a user-supplied path against the working directory
pub(crate) fn resolve(cwd: &str, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        PathBuf::from(cwd).join(path)
    }
}

/// Read and validate an exported story file
pub(crate) fn load_story(path: &Path) -> Result<Story> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;

    match import_story(&source) {
        Ok(story) => Ok(story),
        Err(ImportError::Validation(violations)) => {
            let details: Vec<String> = violations.iter().map(|v| format!("  {}", v)).collect();
            Err(anyhow::anyhow!(
                "{} is not a valid story:\n{}",
                path.display(),
                details.join("\n")
            ))
        }
        Err(err) => Err(anyhow::Error::new(err).context(format!("Cannot import {}", path.display()))),
    }
}

pub(crate) fn write_story(path: &Path, story: &Story) -> Result<()> {
    let json = quire_editor::export_story(story)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
    Ok(())
}
