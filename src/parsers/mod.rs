//! Function locator
//!
//! Statically parses every Go file below a directory and maps each
//! `filename:line` to the function or method declared there. The map is what
//! lets the rule matcher tell `(Url).String` apart from `(Path).String`.

mod go;

pub use go::parse_source;

use crate::models::{FunctionLocation, FunctionLocationMap};
use ignore::{DirEntry, WalkBuilder};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that abort a source scan
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed walking {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },

    #[error("failed reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed parsing {filename}: syntax error at line {line}")]
    Syntax { filename: String, line: usize },

    #[error("failed loading Go grammar: {0}")]
    Grammar(String),
}

/// Directories the go tool itself never builds
fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "vendor" || name == "testdata" || name.starts_with('_')
}

/// Collect all `.go` files below `root`
pub fn collect_go_files(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .filter_entry(|e| !is_skipped_dir(e))
        .build();

    for entry in walker {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("go") {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Path of `file` relative to `root`, with `/` separators
fn relative_filename(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the `filename:line` → declaration map for every Go file below `root`.
///
/// Fails on the first unreadable or unparsable file; no partial map is
/// returned.
pub fn locate_functions(root: &Path) -> Result<FunctionLocationMap, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingDirectory(root.to_path_buf()));
    }

    let files = collect_go_files(root)?;
    debug!("Scanning {} Go files below {}", files.len(), root.display());

    let per_file: Vec<Vec<FunctionLocation>> = files
        .par_iter()
        .map(|path| go::parse(path, &relative_filename(root, path)))
        .collect::<Result<_, _>>()?;

    let map: FunctionLocationMap = per_file
        .into_iter()
        .flatten()
        .map(|loc| (loc.key(), loc))
        .collect();

    debug!("Located {} functions and methods", map.len());
    Ok(map)
}
