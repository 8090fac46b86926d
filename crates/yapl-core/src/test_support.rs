//! Fixtures shared by unit tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use yapl_schema::{AppSpec, VersionInfo};

use crate::launch::LaunchContext;
use crate::resolver::ResolvedComponents;

/// A throwaway working root with a Proton directory and a prefix path.
pub(crate) struct Fixture {
    pub(crate) dir: TempDir,
    pub(crate) app: AppSpec,
    pub(crate) proton_info: VersionInfo,
    pub(crate) umu_info: VersionInfo,
    pub(crate) proton_root: PathBuf,
    pub(crate) prefix: PathBuf,
    pub(crate) components: ResolvedComponents,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let proton_root = dir.path().join("proton/9.0");
        std::fs::create_dir_all(&proton_root).unwrap();
        let prefix = dir.path().join("games/test/prefix");

        let mut app = AppSpec::template("9.0");
        app.executable = "drive_c/Game/game.exe".to_string();

        Self {
            components: ResolvedComponents {
                proton: proton_root.clone(),
                runtime: None,
                umu_launcher: None,
                dxvk: None,
                vkd3d: None,
            },
            dir,
            app,
            proton_info: VersionInfo::default(),
            umu_info: VersionInfo::default(),
            proton_root,
            prefix,
        }
    }

    pub(crate) fn ctx(&self) -> LaunchContext<'_> {
        LaunchContext::from_parts(
            &self.app,
            &self.proton_info,
            Some(&self.umu_info),
            self.components.clone(),
            self.prefix.clone(),
        )
    }
}

/// Write an executable `sh` script.
pub(crate) fn write_script(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
