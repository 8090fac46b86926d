//! Dependency resolution: decide per component whether acquisition is needed
//! and drive the archive engine.
//!
//! A component directory counts as installed once it exists and is non-empty.
//! The container runtime additionally records the upstream build stamp in
//! `version.txt` so it can be refreshed when a new build is published.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};
use yapl_schema::{AppSpec, ComponentKind, GlobalRegistry, RegistryError, VersionInfo, WineArch};

use crate::io::download;
use crate::io::extract::{self, ArchiveError, Source};
use crate::{Layout, NullReporter, Reporter, dir_is_populated};

/// Build stamp of an installed runtime.
pub const VERSION_FILE: &str = "version.txt";
/// Entry point shipped by upstream runtime archives.
pub const UPSTREAM_ENTRY_POINT: &str = "_v2-entry-point";
/// Entry point name after installation.
pub const ENTRY_POINT: &str = "yapl-entry-point";
/// Wrapper placed between the runtime and Proton.
pub const SHIM_FILE: &str = "yapl-shim";

/// Sets `DISPLAY` for nested Xwayland sessions under gamescope, then execs
/// its arguments.
pub const SHIM_SCRIPT: &str = r#"#!/bin/sh
if [ "${XDG_CURRENT_DESKTOP}" = "gamescope" ] || [ "${XDG_SESSION_DESKTOP}" = "gamescope" ]; then
  if [ "${STEAM_MULTIPLE_XWAYLANDS}" = "1" ]; then
    if [ -z "${DISPLAY}" ]; then
      export DISPLAY=":1"
    fi
  fi
fi
exec "$@"
"#;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{kind} version '{version}' has no URL in runner.json")]
    MissingUrl { kind: String, version: String },

    #[error("custom proton path does not exist: {}", .0.display())]
    MissingLocalPath(PathBuf),

    #[error("failed to acquire {component}: {source}")]
    Acquisition {
        component: String,
        #[source]
        source: ArchiveError,
    },

    #[error("failed to patch {}: {source}", .path.display())]
    Patch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directories of every component an application needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedComponents {
    /// Proton root used for launching (the patched copy for win32 prefixes).
    pub proton: PathBuf,
    pub runtime: Option<PathBuf>,
    pub umu_launcher: Option<PathBuf>,
    pub dxvk: Option<PathBuf>,
    pub vkd3d: Option<PathBuf>,
}

pub struct Resolver<'a> {
    client: Client,
    layout: &'a Layout,
    registry: &'a GlobalRegistry,
    force_upgrade: bool,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("layout", &self.layout)
            .field("force_upgrade", &self.force_upgrade)
            .finish_non_exhaustive()
    }
}

impl<'a> Resolver<'a> {
    pub fn new(client: Client, layout: &'a Layout, registry: &'a GlobalRegistry) -> Self {
        Self {
            client,
            layout,
            registry,
            force_upgrade: false,
            reporter: Arc::new(NullReporter),
        }
    }

    /// Re-acquire Proton even when it is already installed.
    pub fn force_upgrade(mut self, force: bool) -> Self {
        self.force_upgrade = force;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Acquire everything `app` needs: Proton, the managed umu-launcher (umu
    /// launches only), DXVK, VKD3D and the container runtime, in that order.
    pub async fn ensure_all(&self, app: &AppSpec) -> Result<ResolvedComponents, ResolveError> {
        self.reporter.section("Dependencies");
        let proton = self.ensure_proton(&app.proton_version, app.wine_arch).await?;

        let umu_launcher = if app.needs_managed_umu() {
            let version = app.umu_options.version.as_deref().unwrap_or_default();
            self.ensure(ComponentKind::UmuLauncher, version).await?
        } else {
            None
        };

        let deps = &app.dependencies;
        let dxvk = self
            .ensure(ComponentKind::Dxvk, deps.dxvk_version.as_deref().unwrap_or_default())
            .await?;
        let vkd3d = self
            .ensure(ComponentKind::Vkd3d, deps.vkd3d_version.as_deref().unwrap_or_default())
            .await?;
        let runtime = self.ensure_runtime(app.runtime().unwrap_or_default()).await?;

        Ok(ResolvedComponents {
            proton,
            runtime,
            umu_launcher,
            dxvk,
            vkd3d,
        })
    }

    /// Make `dependencies/<kind>/<version>` available.
    ///
    /// An empty version is a no-op. Proton and the runtime are dispatched to
    /// their dedicated routines.
    pub async fn ensure(
        &self,
        kind: ComponentKind,
        version: &str,
    ) -> Result<Option<PathBuf>, ResolveError> {
        match kind {
            ComponentKind::Proton => {
                return self.ensure_proton(version, WineArch::Win64).await.map(Some);
            }
            ComponentKind::Runtime => return self.ensure_runtime(version).await,
            _ => {}
        }
        if version.is_empty() {
            return Ok(None);
        }

        let info = self.registry.lookup(kind, version)?;
        let dir = self.layout.dependency_dir(kind.as_str(), version);
        if dir_is_populated(&dir) {
            debug!("{kind} {version} already installed at {}", dir.display());
            self.reporter.done(kind.as_str(), version, "cached");
            return Ok(Some(dir));
        }

        let url = require_url(info, kind, version)?;
        self.acquire(kind, version, url, &dir).await?;
        Ok(Some(dir))
    }

    /// Make a Proton build available and return the root to launch from.
    ///
    /// A registry `path` is used verbatim. Otherwise `proton/<version>` is
    /// extracted when missing, or re-extracted when forced. For `win32`
    /// prefixes a copy at `proton/<version>-win32` is patched to use the
    /// 32-bit loader and returned instead.
    pub async fn ensure_proton(
        &self,
        version: &str,
        arch: WineArch,
    ) -> Result<PathBuf, ResolveError> {
        let kind = ComponentKind::Proton;
        let info = self.registry.proton(version)?;

        let root = if let Some(path) = info.local_path() {
            if !path.exists() {
                return Err(ResolveError::MissingLocalPath(path.to_path_buf()));
            }
            info!("Using local Proton at {}", path.display());
            self.reporter.done(kind.as_str(), version, "local");
            path.to_path_buf()
        } else {
            let url = require_url(info, kind, version)?;
            let dir = self.layout.proton_dir(version);
            if self.force_upgrade && dir.exists() {
                info!("Removing {} for upgrade", dir.display());
                tokio::fs::remove_dir_all(&dir).await?;
            }
            if dir_is_populated(&dir) {
                self.reporter.done(kind.as_str(), version, "cached");
            } else {
                self.acquire(kind, version, url, &dir).await?;
            }
            dir
        };

        if arch.is_32_bit() {
            return self.patch_for_win32(version, &root).await;
        }
        Ok(root)
    }

    async fn patch_for_win32(&self, version: &str, original: &Path) -> Result<PathBuf, ResolveError> {
        let patched = self.layout.proton_win32_dir(version);
        if self.force_upgrade && patched.exists() {
            tokio::fs::remove_dir_all(&patched).await?;
        }
        if dir_is_populated(&patched) {
            debug!("Found existing win32 Proton at {}", patched.display());
            return Ok(patched);
        }

        info!("Creating win32 Proton at {}", patched.display());
        let result = copy_and_patch(original.to_path_buf(), patched.clone()).await;
        if result.is_err() {
            tokio::fs::remove_dir_all(&patched).await.ok();
        }
        result?;
        self.reporter
            .done(ComponentKind::Proton.as_str(), version, "patched for win32");
        Ok(patched)
    }

    /// Make the container runtime available, refreshing it when upstream
    /// published a new build.
    ///
    /// A failed update probe only warns; the installed runtime is kept.
    pub async fn ensure_runtime(&self, version: &str) -> Result<Option<PathBuf>, ResolveError> {
        if version.is_empty() {
            return Ok(None);
        }
        let kind = ComponentKind::Runtime;
        let info = self.registry.runtime(version)?;
        let url = require_url(info, kind, version)?;
        let source = Source::parse(url).map_err(|e| acquisition(kind, version, e))?;

        let dir = self.layout.runtime_dir(version);
        let stamp_path = dir.join(VERSION_FILE);

        let (install, remote_stamp) = match tokio::fs::read_to_string(&stamp_path).await {
            Err(_) => {
                info!("Runtime {version} not installed");
                (true, None)
            }
            Ok(local) if info.check_for_updates => {
                match download::fetch_build_id(&self.client, &source).await {
                    Ok(remote) if remote != local.trim() => {
                        info!(
                            "Runtime {version} update available ({} -> {remote})",
                            local.trim()
                        );
                        (true, Some(remote))
                    }
                    Ok(_) => {
                        debug!("Runtime {version} is current");
                        (false, None)
                    }
                    Err(e) => {
                        let msg = format!("Could not check runtime {version} for updates: {e}");
                        warn!("{msg}");
                        self.reporter.warning(&msg);
                        (false, None)
                    }
                }
            }
            Ok(_) => (false, None),
        };

        if install {
            self.acquire(kind, version, url, &dir).await?;
            let fixup = self.fixup_runtime(&dir, &source, remote_stamp).await;
            if let Err(e) = fixup {
                tokio::fs::remove_dir_all(&dir).await.ok();
                return Err(e);
            }
        } else {
            self.reporter.done(kind.as_str(), version, "cached");
        }
        Ok(Some(dir))
    }

    async fn fixup_runtime(
        &self,
        dir: &Path,
        source: &Source,
        remote_stamp: Option<String>,
    ) -> Result<(), ResolveError> {
        let upstream = dir.join(UPSTREAM_ENTRY_POINT);
        if tokio::fs::symlink_metadata(&upstream).await.is_ok() {
            tokio::fs::rename(&upstream, dir.join(ENTRY_POINT)).await?;
        }

        let shim = dir.join(SHIM_FILE);
        tokio::fs::write(&shim, SHIM_SCRIPT).await?;
        tokio::fs::set_permissions(&shim, std::fs::Permissions::from_mode(0o755)).await?;

        let stamp = match remote_stamp {
            Some(stamp) => stamp,
            None => match download::fetch_build_id(&self.client, source).await {
                Ok(stamp) => stamp,
                Err(e) => {
                    let msg = format!("Could not fetch runtime build id: {e}");
                    warn!("{msg}");
                    self.reporter.warning(&msg);
                    String::new()
                }
            },
        };
        tokio::fs::write(dir.join(VERSION_FILE), stamp).await?;
        Ok(())
    }

    async fn acquire(
        &self,
        kind: ComponentKind,
        version: &str,
        url: &str,
        dir: &Path,
    ) -> Result<(), ResolveError> {
        info!("Acquiring {kind} '{version}' from {url}");
        self.reporter.fetching(kind.as_str(), version);

        let result = match Source::parse(url) {
            Ok(source) => extract::extract(&self.client, &source, dir).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            if tokio::fs::symlink_metadata(dir).await.is_ok() {
                tokio::fs::remove_dir_all(dir).await.ok();
            }
            return Err(acquisition(kind, version, e));
        }

        self.reporter.done(kind.as_str(), version, "installed");
        Ok(())
    }
}

fn require_url<'i>(
    info: &'i VersionInfo,
    kind: ComponentKind,
    version: &str,
) -> Result<&'i str, ResolveError> {
    info.url().ok_or_else(|| ResolveError::MissingUrl {
        kind: kind.to_string(),
        version: version.to_string(),
    })
}

fn acquisition(kind: ComponentKind, version: &str, source: ArchiveError) -> ResolveError {
    ResolveError::Acquisition {
        component: format!("{kind} '{version}'"),
        source,
    }
}

/// Copy a Proton tree and point its launcher at the 32-bit loader.
async fn copy_and_patch(original: PathBuf, patched: PathBuf) -> Result<(), ResolveError> {
    let copy_target = patched.clone();
    tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&copy_target)?;
        let options = fs_extra::dir::CopyOptions::new().content_only(true).overwrite(true);
        fs_extra::dir::copy(&original, &copy_target, &options).map_err(std::io::Error::other)?;
        Ok::<(), std::io::Error>(())
    })
    .await
    .map_err(std::io::Error::other)??;

    let script = patched.join("proton");
    let contents = tokio::fs::read_to_string(&script)
        .await
        .map_err(|source| ResolveError::Patch {
            path: script.clone(),
            source,
        })?;
    tokio::fs::write(&script, contents.replace("wine64", "wine"))
        .await
        .map_err(|source| ResolveError::Patch {
            path: script.clone(),
            source,
        })?;
    tokio::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::extract::ArchiveFormat;
    use crate::io::extract::tests::compress;
    use mockito::Server;

    /// A tar whose entries all live under `top/`.
    fn tar_with(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_mode(0o755);
            header.set_size(body.len() as u64);
            builder
                .append_data(&mut header, format!("{top}/{name}"), body.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap()
    }

    async fn gz(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
        compress(&tar_with(top, files), ArchiveFormat::TarGz).await
    }

    fn registry(base: &str) -> GlobalRegistry {
        let mut registry = GlobalRegistry::default();
        registry.proton_versions.insert(
            "9.0".into(),
            VersionInfo::from_url(format!("{base}/proton.tar.gz")),
        );
        registry.proton_versions.insert("nourl".into(), VersionInfo::default());
        registry.runtime_versions.insert(
            "sniper".into(),
            VersionInfo {
                check_for_updates: true,
                ..VersionInfo::from_url(format!("{base}/rt/sniper.tar.gz"))
            },
        );
        registry.runtime_versions.insert(
            "pinned".into(),
            VersionInfo::from_url(format!("{base}/rt/sniper.tar.gz")),
        );
        registry.dependency_versions.insert(
            "dxvk".into(),
            [("2.4".to_string(), VersionInfo::from_url(format!("{base}/dxvk.tar.gz")))]
                .into_iter()
                .collect(),
        );
        registry
    }

    #[tokio::test]
    async fn test_ensure_dependency_is_idempotent() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/dxvk.tar.gz")
            .with_status(200)
            .with_body(gz("dxvk-2.4", &[("x64/d3d11.dll", "dll")]).await)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let registry = registry(&server.url());
        let resolver = Resolver::new(Client::new(), &layout, &registry);

        let first = resolver.ensure(ComponentKind::Dxvk, "2.4").await.unwrap();
        let second = resolver.ensure(ComponentKind::Dxvk, "2.4").await.unwrap();
        assert_eq!(first, second);
        let path = first.unwrap();
        assert_eq!(path, layout.dependency_dir("dxvk", "2.4"));
        assert!(path.join("x64/d3d11.dll").exists());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_version_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let registry = GlobalRegistry::default();
        let resolver = Resolver::new(Client::new(), &layout, &registry);

        assert_eq!(resolver.ensure(ComponentKind::Dxvk, "").await.unwrap(), None);
        assert_eq!(resolver.ensure_runtime("").await.unwrap(), None);
        assert!(!dir.path().join("dependencies").exists());
    }

    #[tokio::test]
    async fn test_unknown_version_fails_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let registry = registry("http://127.0.0.1:9");
        let resolver = Resolver::new(Client::new(), &layout, &registry);

        let err = resolver
            .ensure_proton("nonexistent", WineArch::Win64)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Registry(RegistryError::UnknownVersion { ref version, .. }) if version == "nonexistent"
        ));

        let err = resolver.ensure(ComponentKind::Vkd3d, "1.0").await.unwrap_err();
        assert!(matches!(err, ResolveError::Registry(RegistryError::UnknownKind(_))));
        assert!(!dir.path().join("proton").exists());
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let registry = registry("http://127.0.0.1:9");
        let resolver = Resolver::new(Client::new(), &layout, &registry);

        let err = resolver.ensure_proton("nourl", WineArch::Win64).await.unwrap_err();
        assert!(matches!(err, ResolveError::MissingUrl { .. }));
    }

    #[tokio::test]
    async fn test_local_proton_path() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let local = dir.path().join("my-proton");

        let mut registry = GlobalRegistry::default();
        registry.proton_versions.insert(
            "local".into(),
            VersionInfo {
                path: Some(local.clone()),
                ..VersionInfo::default()
            },
        );
        let resolver = Resolver::new(Client::new(), &layout, &registry);

        let err = resolver.ensure_proton("local", WineArch::Win64).await.unwrap_err();
        assert!(matches!(err, ResolveError::MissingLocalPath(ref p) if *p == local));

        std::fs::create_dir_all(&local).unwrap();
        let root = resolver.ensure_proton("local", WineArch::Win64).await.unwrap();
        assert_eq!(root, local);
        assert!(!layout.proton_dir("local").exists());
    }

    #[tokio::test]
    async fn test_force_upgrade_reacquires_proton() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/proton.tar.gz")
            .with_status(200)
            .with_body(gz("GE-Proton9", &[("proton", "#!/bin/sh\n")]).await)
            .expect(2)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let registry = registry(&server.url());

        let resolver = Resolver::new(Client::new(), &layout, &registry);
        resolver.ensure_proton("9.0", WineArch::Win64).await.unwrap();
        std::fs::write(layout.proton_dir("9.0").join("stale"), "x").unwrap();
        resolver.ensure_proton("9.0", WineArch::Win64).await.unwrap();

        let resolver = Resolver::new(Client::new(), &layout, &registry).force_upgrade(true);
        let root = resolver.ensure_proton("9.0", WineArch::Win64).await.unwrap();
        assert!(root.join("proton").exists());
        assert!(!root.join("stale").exists());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_win32_patched_copy() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/proton.tar.gz")
            .with_status(200)
            .with_body(
                gz(
                    "GE-Proton9",
                    &[
                        ("proton", "#!/usr/bin/env python3\nwine_path = 'files/bin/wine64'\n"),
                        ("files/bin/wine", "bin"),
                    ],
                )
                .await,
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let registry = registry(&server.url());
        let resolver = Resolver::new(Client::new(), &layout, &registry);

        let root = resolver.ensure_proton("9.0", WineArch::Win32).await.unwrap();
        assert_eq!(root, layout.proton_win32_dir("9.0"));

        let patched = std::fs::read_to_string(root.join("proton")).unwrap();
        assert!(patched.contains("files/bin/wine'"));
        assert!(!patched.contains("wine64"));
        assert!(root.join("files/bin/wine").exists());

        let original = std::fs::read_to_string(layout.proton_dir("9.0").join("proton")).unwrap();
        assert!(original.contains("wine64"));
    }

    #[tokio::test]
    async fn test_runtime_fresh_install_fixup() {
        let mut server = Server::new_async().await;
        let archive = server
            .mock("GET", "/rt/sniper.tar.gz")
            .with_status(200)
            .with_body(
                gz(
                    "SteamLinuxRuntime_sniper",
                    &[(UPSTREAM_ENTRY_POINT, "#!/bin/sh\n"), ("run", "#!/bin/sh\n")],
                )
                .await,
            )
            .expect(1)
            .create_async()
            .await;
        let _stamp = server
            .mock("GET", "/rt/BUILD_ID.txt")
            .with_status(200)
            .with_body("0.20240101.1\n")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let registry = registry(&server.url());
        let resolver = Resolver::new(Client::new(), &layout, &registry);

        let rt = resolver.ensure_runtime("sniper").await.unwrap().unwrap();
        assert_eq!(
            std::fs::read_to_string(rt.join(VERSION_FILE)).unwrap(),
            "0.20240101.1"
        );
        assert!(rt.join(ENTRY_POINT).exists());
        assert!(!rt.join(UPSTREAM_ENTRY_POINT).exists());
        assert_eq!(std::fs::read_to_string(rt.join(SHIM_FILE)).unwrap(), SHIM_SCRIPT);
        let mode = std::fs::metadata(rt.join(SHIM_FILE)).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);

        // Current stamp: nothing is downloaded again.
        resolver.ensure_runtime("sniper").await.unwrap();
        archive.assert_async().await;
    }

    #[tokio::test]
    async fn test_runtime_reinstalled_when_build_changes() {
        let mut server = Server::new_async().await;
        let body = gz("rt", &[("run", "#!/bin/sh\n")]).await;
        let archive = server
            .mock("GET", "/rt/sniper.tar.gz")
            .with_status(200)
            .with_body(body)
            .expect(2)
            .create_async()
            .await;
        let old = server
            .mock("GET", "/rt/BUILD_ID.txt")
            .with_status(200)
            .with_body("1")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let registry = registry(&server.url());
        let resolver = Resolver::new(Client::new(), &layout, &registry);

        let rt = resolver.ensure_runtime("sniper").await.unwrap().unwrap();
        assert_eq!(std::fs::read_to_string(rt.join(VERSION_FILE)).unwrap(), "1");

        old.remove_async().await;
        let _new = server
            .mock("GET", "/rt/BUILD_ID.txt")
            .with_status(200)
            .with_body("2\n")
            .create_async()
            .await;

        resolver.ensure_runtime("sniper").await.unwrap();
        assert_eq!(std::fs::read_to_string(rt.join(VERSION_FILE)).unwrap(), "2");
        archive.assert_async().await;
    }

    #[tokio::test]
    async fn test_runtime_probe_failure_keeps_install() {
        let mut server = Server::new_async().await;
        let archive = server
            .mock("GET", "/rt/sniper.tar.gz")
            .with_status(200)
            .with_body(gz("rt", &[("run", "#!/bin/sh\n")]).await)
            .expect(0)
            .create_async()
            .await;
        let _stamp = server
            .mock("GET", "/rt/BUILD_ID.txt")
            .with_status(500)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let rt = layout.runtime_dir("sniper");
        std::fs::create_dir_all(&rt).unwrap();
        std::fs::write(rt.join(VERSION_FILE), "1").unwrap();

        let registry = registry(&server.url());
        let resolver = Resolver::new(Client::new(), &layout, &registry);
        let result = resolver.ensure_runtime("sniper").await.unwrap();
        assert_eq!(result, Some(rt.clone()));
        assert_eq!(std::fs::read_to_string(rt.join(VERSION_FILE)).unwrap(), "1");
        archive.assert_async().await;
    }

    #[tokio::test]
    async fn test_runtime_without_update_checks_is_not_probed() {
        let mut server = Server::new_async().await;
        let stamp = server
            .mock("GET", "/rt/BUILD_ID.txt")
            .with_status(200)
            .with_body("2")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let rt = layout.runtime_dir("pinned");
        std::fs::create_dir_all(&rt).unwrap();
        std::fs::write(rt.join(VERSION_FILE), "1").unwrap();

        let registry = registry(&server.url());
        let resolver = Resolver::new(Client::new(), &layout, &registry);
        resolver.ensure_runtime("pinned").await.unwrap();
        stamp.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_acquisition_leaves_no_directory() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/dxvk.tar.gz")
            .with_status(200)
            .with_body("not an archive")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let registry = registry(&server.url());
        let resolver = Resolver::new(Client::new(), &layout, &registry);

        let err = resolver.ensure(ComponentKind::Dxvk, "2.4").await.unwrap_err();
        assert!(matches!(err, ResolveError::Acquisition { .. }));
        assert!(!layout.dependency_dir("dxvk", "2.4").exists());
    }

    #[tokio::test]
    async fn test_ensure_all_skips_unconfigured() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/proton.tar.gz")
            .with_status(200)
            .with_body(gz("p", &[("proton", "#!/bin/sh\n")]).await)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let registry = registry(&server.url());
        let resolver = Resolver::new(Client::new(), &layout, &registry);

        let app = AppSpec::template("9.0");
        let resolved = resolver.ensure_all(&app).await.unwrap();
        assert_eq!(resolved.proton, layout.proton_dir("9.0"));
        assert_eq!(resolved.runtime, None);
        assert_eq!(resolved.dxvk, None);
        assert_eq!(resolved.umu_launcher, None);
    }
}
