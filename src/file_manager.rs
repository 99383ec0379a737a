use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Skipped;
use crate::url_mapper::ResolvedUrl;

/// Where mirrored files end up.
#[cfg_attr(test, mockall::automock)]
pub trait StorageSink {
    /// Returns the handle of `parent/name`, creating it if absent.
    fn ensure_directory(&self, parent: &Path, name: &str) -> Result<PathBuf>;

    /// Writes `content` to `directory/name`, replacing any existing file.
    fn write_file(&self, directory: &Path, name: &str, content: &[u8]) -> Result<PathBuf>;
}

#[derive(Clone, Default)]
pub struct FileManager;

impl FileManager {
    pub fn new() -> Self {
        Self
    }
}

impl StorageSink for FileManager {
    fn ensure_directory(&self, parent: &Path, name: &str) -> Result<PathBuf> {
        check_name(name)?;
        let path = parent.join(name);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {:?}", path))?;
        Ok(path)
    }

    fn write_file(&self, directory: &Path, name: &str, content: &[u8]) -> Result<PathBuf> {
        check_name(name)?;
        let path = directory.join(name);
        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path))?;
        Ok(path)
    }
}

// Segments come from URL paths; none of them may step outside the Site Root.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        bail!("refusing unsafe path segment {:?}", name);
    }
    Ok(())
}

/// A file written by [`persist`], with any directories that had to be skipped.
#[derive(Debug)]
pub struct Persisted {
    pub path: PathBuf,
    pub warnings: Vec<Skipped>,
}

/// Materializes `resolved` under `site_root`, one `ensure_directory` per segment.
///
/// A directory that cannot be created is reported and the file lands in the
/// last directory that could be. Only the final write can fail.
pub fn persist<S: StorageSink + ?Sized>(
    sink: &S,
    site_root: &Path,
    resolved: &ResolvedUrl,
    content: &[u8],
) -> Result<Persisted> {
    let mut current = site_root.to_path_buf();
    let mut warnings = Vec::new();

    for segment in &resolved.directories {
        match sink.ensure_directory(&current, segment) {
            Ok(dir) => current = dir,
            Err(source) => warnings.push(Skipped::Directory {
                parent: current.clone(),
                name: segment.clone(),
                source,
            }),
        }
    }

    let path = sink.write_file(&current, &resolved.file_name, content)?;
    Ok(Persisted { path, warnings })
}
