//! Per-application launch configuration (`game.json` / `app.json`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::arch::WineArch;
use crate::registry::{ComponentKind, GlobalRegistry, RegistryError};

/// Entrypoint name of a stock Proton build.
pub const PROTON_ENTRYPOINT: &str = "proton";

/// How the target executable is started.
///
/// Unknown tags are rejected while the spec is deserialized, so dispatch
/// never sees an unrecognized method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMethod {
    /// Run Proton (or an alternate Wine binary) directly on the host.
    #[default]
    Direct,
    /// Run Proton inside the Steam Linux Runtime container.
    Container,
    /// Hand off to umu-launcher.
    Umu,
}

impl LaunchMethod {
    /// Configuration tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Container => "container",
            Self::Umu => "umu",
        }
    }
}

impl std::fmt::Display for LaunchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a target lives under `games/` or `apps/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppKind {
    /// A game (`games/<name>/game.json`).
    Game,
    /// An application (`apps/<name>/app.json`).
    App,
}

impl AppKind {
    /// Directory under the working root holding targets of this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Game => "games",
            Self::App => "apps",
        }
    }

    /// Name of the spec file inside a target directory.
    pub fn config_file(&self) -> &'static str {
        match self {
            Self::Game => "game.json",
            Self::App => "app.json",
        }
    }
}

impl std::str::FromStr for AppKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "game" | "games" => Ok(Self::Game),
            "app" | "apps" => Ok(Self::App),
            _ => Err(format!("Unknown target type: {s}")),
        }
    }
}

/// Options for the umu-launcher strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UmuOptions {
    /// Managed umu-launcher version (from `dependency_versions["umu-launcher"]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Use `umu-run` from `PATH` instead of a managed copy.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_system_binary: bool,

    /// Value exported as `GAMEID`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,

    /// Value exported as `STORE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,

    /// Arguments passed to the target before the app's own `launch_args`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub launch_args: Vec<String>,
}

/// How DXVK is provided to the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DxvkMode {
    /// Whatever the Proton build ships.
    #[default]
    Bundled,
    /// Copy DLLs from a managed DXVK/VKD3D download into the prefix.
    Custom,
}

/// Graphics-translation dependencies selected by an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDependencies {
    /// DXVK version to fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dxvk_version: Option<String>,

    /// VKD3D-Proton version to fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vkd3d_version: Option<String>,

    /// Installation mode for the DLLs.
    #[serde(default)]
    pub dxvk_mode: DxvkMode,

    /// Directory under `drive_c` receiving the DXVK DLLs in custom mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dxvk_install_path: Option<String>,

    /// Direct3D level selecting which DXVK DLLs to copy (`9`, `10` or `11`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dxvk_directx_version: Option<String>,

    /// Directory under `drive_c` receiving the VKD3D DLLs in custom mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vkd3d_install_path: Option<String>,
}

/// Errors found while validating an [`AppSpec`] against the registry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A referenced version is not registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// `executable` is empty.
    #[error("'executable' must be set")]
    EmptyExecutable,

    /// Container launches need a runtime.
    #[error("launch_method 'container' requires 'runtime_version' to be set")]
    MissingRuntime,

    /// Managed umu-launcher needs a version.
    #[error("'umu_options.version' must be set unless 'use_system_binary' is true")]
    MissingUmuVersion,

    /// DirectX level outside `9`, `10`, `11`.
    #[error("unsupported dxvk_directx_version '{0}' (expected 9, 10 or 11)")]
    UnknownDirectXLevel(String),
}

/// Launch configuration for one application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSpec {
    /// Proton version key in the registry.
    pub proton_version: String,

    /// Container runtime version key, required for `container` launches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,

    /// Launch strategy.
    #[serde(default)]
    pub launch_method: LaunchMethod,

    /// Alternate binary (relative to the Proton root) used instead of the
    /// `proton` entrypoint, e.g. `files/bin/wine`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proton_bin_name: Option<String>,

    /// Target executable, relative to the prefix.
    pub executable: String,

    /// Steam app id written to `steam_appid.txt` and exported to the game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_app_id: Option<String>,

    /// Prefix architecture.
    #[serde(default)]
    pub wine_arch: WineArch,

    /// Extra arguments for the target.
    #[serde(default)]
    pub launch_args: Vec<String>,

    /// Winetricks verbs the user intends to apply (informational).
    #[serde(default)]
    pub winetricks: Vec<String>,

    /// umu-launcher options.
    #[serde(default)]
    pub umu_options: UmuOptions,

    /// Graphics dependencies.
    #[serde(default)]
    pub dependencies: AppDependencies,

    /// `WINEDLLOVERRIDES` entries: DLL name → setting (e.g. `n,b`).
    #[serde(default)]
    pub dll_overrides: BTreeMap<String, String>,

    /// Environment overrides applied after every computed variable.
    #[serde(default)]
    pub environment_vars: BTreeMap<String, String>,
}

impl AppSpec {
    /// Default spec written for a new target.
    pub fn template(proton_version: impl Into<String>) -> Self {
        Self {
            proton_version: proton_version.into(),
            executable: "drive_c/windows/explorer.exe".to_string(),
            ..Self::default()
        }
    }

    /// Name of the binary inside the Proton root used for launching.
    pub fn bin_name(&self) -> &str {
        self.proton_bin_name
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(PROTON_ENTRYPOINT)
    }

    /// Whether the stock `proton` entrypoint is used.
    pub fn uses_proton_entrypoint(&self) -> bool {
        self.bin_name() == PROTON_ENTRYPOINT
    }

    /// Configured identity tag, ignoring empty and `"0"`.
    pub fn app_id(&self) -> Option<&str> {
        self.steam_app_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != crate::NO_APP_ID)
    }

    /// Runtime version, ignoring an empty string.
    pub fn runtime(&self) -> Option<&str> {
        self.runtime_version.as_deref().filter(|v| !v.is_empty())
    }

    /// Whether a managed umu-launcher copy must be installed.
    pub fn needs_managed_umu(&self) -> bool {
        self.launch_method == LaunchMethod::Umu && !self.umu_options.use_system_binary
    }

    /// Check the spec for missing prerequisites before anything is fetched.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self, registry: &GlobalRegistry) -> Result<(), ConfigError> {
        registry.proton(&self.proton_version)?;

        if self.executable.trim().is_empty() {
            return Err(ConfigError::EmptyExecutable);
        }

        match self.launch_method {
            LaunchMethod::Container if self.runtime().is_none() => {
                return Err(ConfigError::MissingRuntime);
            }
            LaunchMethod::Umu if self.needs_managed_umu() => {
                let version = self
                    .umu_options
                    .version
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .ok_or(ConfigError::MissingUmuVersion)?;
                registry.dependency(ComponentKind::UmuLauncher.as_str(), version)?;
            }
            _ => {}
        }

        if let Some(runtime) = self.runtime() {
            registry.runtime(runtime)?;
        }

        for (kind, version) in [
            (ComponentKind::Dxvk, &self.dependencies.dxvk_version),
            (ComponentKind::Vkd3d, &self.dependencies.vkd3d_version),
        ] {
            if let Some(version) = version.as_deref().filter(|v| !v.is_empty()) {
                registry.dependency(kind.as_str(), version)?;
            }
        }

        if let Some(level) = &self.dependencies.dxvk_directx_version {
            if !matches!(level.as_str(), "9" | "10" | "11") {
                return Err(ConfigError::UnknownDirectXLevel(level.clone()));
            }
        }

        Ok(())
    }
}
