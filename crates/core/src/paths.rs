//! Resolution of logical file names into concrete paths

use crate::error::PathError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Storage location category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directory {
    /// User documents
    #[default]
    Documents,
    /// Disposable caches
    Caches,
    /// User desktop
    Desktop,
    /// Per-user configuration
    Config,
    /// Per-user application data
    Data,
    /// User home directory
    Home,
    /// System temporary directory
    Temp,
}

impl Directory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Directory::Documents => "documents",
            Directory::Caches => "caches",
            Directory::Desktop => "desktop",
            Directory::Config => "config",
            Directory::Data => "data",
            Directory::Home => "home",
            Directory::Temp => "temp",
        }
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a file name and a directory category to a path
pub trait PathResolver {
    fn resolve(&self, name: &str, directory: Directory) -> Result<PathBuf, PathError>;
}

/// Platform storage locations, as reported by the `dirs` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformDirs;

impl PlatformDirs {
    fn base(directory: Directory) -> Option<PathBuf> {
        match directory {
            Directory::Documents => dirs::document_dir(),
            Directory::Caches => dirs::cache_dir(),
            Directory::Desktop => dirs::desktop_dir(),
            Directory::Config => dirs::config_dir(),
            Directory::Data => dirs::data_dir(),
            Directory::Home => dirs::home_dir(),
            Directory::Temp => Some(std::env::temp_dir()),
        }
    }
}

impl PathResolver for PlatformDirs {
    fn resolve(&self, name: &str, directory: Directory) -> Result<PathBuf, PathError> {
        let relative = normalize_name(name)?;
        let base = Self::base(directory).ok_or(PathError::Unavailable(directory))?;
        Ok(base.join(relative))
    }
}

/// Every category as a subdirectory of one root
///
/// `RootDir::new("/srv/app").resolve("a.json", Directory::Caches)` gives
/// `/srv/app/caches/a.json`. Useful for sandboxes and tests.
#[derive(Debug, Clone)]
pub struct RootDir {
    root: PathBuf,
}

impl RootDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PathResolver for RootDir {
    fn resolve(&self, name: &str, directory: Directory) -> Result<PathBuf, PathError> {
        let relative = normalize_name(name)?;
        Ok(self.root.join(directory.as_str()).join(relative))
    }
}

/// Normalize a file name for storage
///
/// - Rejects empty names, absolute paths and `..`
/// - Removes `./` components
fn normalize_name(name: &str) -> Result<PathBuf, PathError> {
    let invalid = |reason| PathError::InvalidName {
        name: name.to_string(),
        reason,
    };

    let mut normalized = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("parent directory references are not allowed")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("absolute paths are not allowed"))
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(invalid("name is empty"));
    }
    Ok(normalized)
}
