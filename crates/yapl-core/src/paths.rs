use std::path::{Path, PathBuf};

use yapl_schema::{AppKind, ComponentKind, REGISTRY_FILE};

/// Name of the directory holding a target's Wine prefix.
pub const PREFIX_DIR: &str = "prefix";

/// On-disk layout of a working root.
///
/// ```text
/// <root>/runner.json
/// <root>/proton/<version>[-win32]/
/// <root>/dependencies/<kind>/<version>/
/// <root>/games/<name>/{game.json,prefix/}
/// <root>/apps/<name>/{app.json,prefix/}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/runner.json`
    pub fn registry_file(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    /// `<root>/proton/<version>`
    pub fn proton_dir(&self, version: &str) -> PathBuf {
        self.root.join("proton").join(version)
    }

    /// `<root>/proton/<version>-win32`, the copy patched for 32-bit prefixes.
    pub fn proton_win32_dir(&self, version: &str) -> PathBuf {
        self.root.join("proton").join(format!("{version}-win32"))
    }

    /// `<root>/dependencies/<kind>/<version>`
    pub fn dependency_dir(&self, kind: &str, version: &str) -> PathBuf {
        self.root.join("dependencies").join(kind).join(version)
    }

    /// `<root>/dependencies/runtime/<version>`
    pub fn runtime_dir(&self, version: &str) -> PathBuf {
        self.dependency_dir(ComponentKind::Runtime.as_str(), version)
    }

    /// `<root>/games/<name>` or `<root>/apps/<name>`
    pub fn app_dir(&self, kind: AppKind, name: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(name)
    }

    /// `game.json` / `app.json` inside the target directory.
    pub fn app_config(&self, kind: AppKind, name: &str) -> PathBuf {
        self.app_dir(kind, name).join(kind.config_file())
    }

    /// `<app_dir>/prefix`
    pub fn prefix_dir(&self, kind: AppKind, name: &str) -> PathBuf {
        self.app_dir(kind, name).join(PREFIX_DIR)
    }
}

/// Whether `path` is a directory with at least one entry.
pub fn dir_is_populated(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}
