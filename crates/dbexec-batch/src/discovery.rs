//! Script discovery
//!
//! Walks a root directory depth-first. Entries of every directory are
//! visited in file-name order, and a subdirectory is descended into at the
//! position its name sorts to, so `a/b/y.sql` comes before `a/x.sql`.

use dbexec_core::{DbExecError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SCRIPT_EXTENSION: &str = ".sql";

/// A discovered script and its full text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Lazy, single-pass sequence of discovered scripts.
///
/// Each script is read when the iterator reaches it. Traversal and read
/// errors are yielded as `Err` items; re-run `discover` to scan again.
pub struct ScriptFiles {
    walker: walkdir::IntoIter,
}

impl Iterator for ScriptFiles {
    type Item = Result<ScriptFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(walk_error(e))),
            };

            if !entry.file_type().is_file() || !is_script(entry.path()) {
                continue;
            }

            let path = entry.into_path();
            return Some(
                std::fs::read_to_string(&path)
                    .map(|contents| ScriptFile { path, contents })
                    .map_err(DbExecError::Io),
            );
        }
    }
}

/// Check that `root` names an existing directory, without reading it
pub fn validate_root(root: &Path) -> Result<()> {
    if root.as_os_str().is_empty() {
        return Err(DbExecError::Configuration("query folder not selected".into()));
    }
    if !root.exists() {
        return Err(DbExecError::NotFound(format!(
            "query folder '{}' does not exist",
            root.display()
        )));
    }
    if !root.is_dir() {
        return Err(DbExecError::Configuration(format!(
            "query folder '{}' is not a directory",
            root.display()
        )));
    }
    Ok(())
}

/// Discover every `.sql` file below `root`
pub fn discover(root: &Path) -> Result<ScriptFiles> {
    validate_root(root)?;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    Ok(ScriptFiles { walker })
}

fn is_script(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(SCRIPT_EXTENSION))
        .unwrap_or(false)
}

fn walk_error(err: walkdir::Error) -> DbExecError {
    let context = err
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    match err.into_io_error() {
        Some(io) => DbExecError::Io(std::io::Error::new(
            io.kind(),
            format!("{}: {}", context, io),
        )),
        None => DbExecError::Other(format!("failed to walk '{}'", context)),
    }
}
