//! Environment assembly for Proton processes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::LaunchContext;

/// Ordered environment overrides. Later entries shadow earlier ones with the
/// same key; everything not listed is inherited from the parent process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchEnv {
    vars: Vec<(String, String)>,
}

impl LaunchEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.push((key.into(), value.into()));
    }

    fn set_path(&mut self, key: &str, value: &Path) {
        self.set(key, value.to_string_lossy());
    }

    /// Effective value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Position of the effective entry for `key`.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.vars.iter().rposition(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Apply in order on top of the inherited environment.
    pub fn apply(&self, cmd: &mut Command) {
        for (key, value) in &self.vars {
            cmd.env(key, value);
        }
    }
}

/// `WINEDLLOVERRIDES` value: `name=setting` pairs joined with `;`, sorted by
/// name. `None` when there are no overrides.
pub fn dll_overrides_string(overrides: &BTreeMap<String, String>) -> Option<String> {
    if overrides.is_empty() {
        return None;
    }
    let joined = overrides
        .iter()
        .map(|(dll, setting)| format!("{dll}={setting}"))
        .collect::<Vec<_>>()
        .join(";");
    Some(joined)
}

/// Full Proton environment, reading `PATH` and `LD_LIBRARY_PATH` from the
/// current process.
pub fn shared_env(ctx: &LaunchContext<'_>, extra: &[(&str, String)]) -> LaunchEnv {
    shared_env_with(ctx, extra, |key| std::env::var(key).ok())
}

/// Full Proton environment.
///
/// Order: library and binary search paths, Steam compatibility descriptors,
/// Wine DLL and Python hints, identity, debug switches, `extra`, DLL
/// overrides, then the user's own variables.
pub fn shared_env_with(
    ctx: &LaunchContext<'_>,
    extra: &[(&str, String)],
    existing: impl Fn(&str) -> Option<String>,
) -> LaunchEnv {
    let root = ctx.proton_root();
    let prefix = ctx.prefix();
    let info = ctx.proton_info();
    let mut env = LaunchEnv::new();

    let libs = [root.join("files/lib64"), root.join("files/lib")]
        .into_iter()
        .chain(info.ld_library_path_components.iter().map(|c| root.join(c)));
    if let Some(value) = search_path(libs, existing("LD_LIBRARY_PATH")) {
        env.set("LD_LIBRARY_PATH", value);
    }

    let bins = [root.join("bin"), root.join("dist/bin"), root.join("files/bin")].into_iter();
    if let Some(value) = search_path(bins, existing("PATH")) {
        env.set("PATH", value);
    }

    env.set("WINEARCH", ctx.app().wine_arch.as_str());
    env.set_path("WINEPREFIX", prefix);
    env.set_path("STEAM_COMPAT_DATA_PATH", prefix);
    env.set_path("STEAM_COMPAT_CLIENT_INSTALL_PATH", &ctx.executable_dir());
    env.set_path("STEAM_COMPAT_TOOL_PATHS", root);
    env.set_path("STEAM_COMPAT_MOUNTS", root);
    env.set_path("STEAM_COMPAT_SHADER_PATH", &prefix.join("shadercache"));
    env.set("PROTON_VERB", "waitforexitandrun");

    if !info.wine_dll_path_components.is_empty() {
        let dll_paths = info
            .wine_dll_path_components
            .iter()
            .map(|c| root.join(c).to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(":");
        env.set("WINEDLLPATH", dll_paths);
    }
    if let Some(home) = &info.python_home {
        env.set_path("PYTHONHOME", &root.join(home));
    }
    if let Some(path) = &info.python_path {
        env.set_path("PYTHONPATH", &root.join(path));
    }

    if let Some(app_id) = ctx.app().app_id() {
        env.set("STEAM_COMPAT_APP_ID", app_id);
        env.set("SteamAppId", app_id);
        env.set("SteamGameId", app_id);
    }

    if ctx.is_debug() {
        env.set("PROTON_LOG", "1");
        env.set("DXVK_LOG_LEVEL", "info");
        env.set("VKD3D_DEBUG", "warn");
    }

    for (key, value) in extra {
        env.set(*key, value.clone());
    }

    finish(ctx, &mut env);
    env
}

/// Environment for an alternate Wine-like binary: prefix and architecture,
/// DLL overrides and the user's variables.
pub fn minimal_env(ctx: &LaunchContext<'_>) -> LaunchEnv {
    let mut env = LaunchEnv::new();
    env.set_path("WINEPREFIX", ctx.prefix());
    env.set("WINEARCH", ctx.app().wine_arch.as_str());
    finish(ctx, &mut env);
    env
}

/// Environment for `wineboot`: only the prefix and its architecture.
pub fn bootstrap_env(ctx: &LaunchContext<'_>) -> LaunchEnv {
    let mut env = LaunchEnv::new();
    env.set_path("WINEPREFIX", ctx.prefix());
    env.set("WINEARCH", ctx.app().wine_arch.as_str());
    env
}

fn finish(ctx: &LaunchContext<'_>, env: &mut LaunchEnv) {
    if let Some(overrides) = dll_overrides_string(&ctx.app().dll_overrides) {
        env.set("WINEDLLOVERRIDES", overrides);
    }
    for (key, value) in &ctx.app().environment_vars {
        env.set(key.clone(), value.clone());
    }
}

/// Join the existing `candidates` and the inherited value with `:`.
fn search_path(
    candidates: impl Iterator<Item = PathBuf>,
    inherited: Option<String>,
) -> Option<String> {
    let mut parts: Vec<String> = candidates
        .filter(|p| p.exists())
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    if let Some(inherited) = inherited.filter(|v| !v.is_empty()) {
        parts.push(inherited);
    }
    (!parts.is_empty()).then(|| parts.join(":"))
}
