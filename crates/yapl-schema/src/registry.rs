//! The global version registry (`runner.json`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Acquisition metadata for one version of one component.
///
/// Identity is the pair (component kind, version string); the registry owns
/// one of these per pair and never mutates it after load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Remote (or local) archive to extract the component from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Pre-installed directory used verbatim instead of downloading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Sub-path (relative to the component root) holding its executables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_path: Option<String>,

    /// Compare against the upstream `BUILD_ID.txt` on every run.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub check_for_updates: bool,

    /// Extra `LD_LIBRARY_PATH` fragments, relative to the component root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ld_library_path_components: Vec<String>,

    /// `WINEDLLPATH` fragments, relative to the component root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wine_dll_path_components: Vec<String>,

    /// Value exported as `PYTHONHOME` for builds that bundle an interpreter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_home: Option<String>,

    /// Value exported as `PYTHONPATH` for builds that bundle an interpreter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_path: Option<String>,
}

impl VersionInfo {
    /// Metadata pointing at a downloadable archive.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// The archive URL, treating an empty string as absent.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    /// The local override directory, treating an empty path as absent.
    pub fn local_path(&self) -> Option<&std::path::Path> {
        self.path.as_deref().filter(|p| !p.as_os_str().is_empty())
    }
}

/// Independently versioned, cacheable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// The Proton compatibility layer.
    Proton,
    /// The Steam Linux Runtime container.
    Runtime,
    /// DXVK (Direct3D 9-11 over Vulkan).
    Dxvk,
    /// VKD3D-Proton (Direct3D 12 over Vulkan).
    Vkd3d,
    /// The umu helper launcher.
    UmuLauncher,
}

impl ComponentKind {
    /// Key used in `dependency_versions` and in the cache layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proton => "proton",
            Self::Runtime => "runtime",
            Self::Dxvk => "dxvk",
            Self::Vkd3d => "vkd3d",
            Self::UmuLauncher => "umu-launcher",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised by registry lookups.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The requested version is not registered for this component.
    #[error("{kind} version '{version}' not defined in runner.json")]
    UnknownVersion {
        /// Component kind (e.g. `proton`, `dxvk`).
        kind: String,
        /// The version string that was asked for.
        version: String,
    },

    /// The dependency kind has no table at all.
    #[error("dependency type '{0}' not defined in runner.json")]
    UnknownKind(String),
}

/// All known component versions, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalRegistry {
    /// Proton builds by version.
    #[serde(default)]
    pub proton_versions: BTreeMap<String, VersionInfo>,

    /// Container runtimes by version.
    #[serde(default)]
    pub runtime_versions: BTreeMap<String, VersionInfo>,

    /// Auxiliary dependencies: kind → version → metadata.
    #[serde(default)]
    pub dependency_versions: BTreeMap<String, BTreeMap<String, VersionInfo>>,
}

impl GlobalRegistry {
    /// Look up a Proton build.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownVersion`] when `version` is not registered.
    pub fn proton(&self, version: &str) -> Result<&VersionInfo, RegistryError> {
        self.proton_versions
            .get(version)
            .ok_or_else(|| unknown(ComponentKind::Proton.as_str(), version))
    }

    /// Look up a container runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownVersion`] when `version` is not registered.
    pub fn runtime(&self, version: &str) -> Result<&VersionInfo, RegistryError> {
        self.runtime_versions
            .get(version)
            .ok_or_else(|| unknown(ComponentKind::Runtime.as_str(), version))
    }

    /// Look up an auxiliary dependency such as `dxvk` or `umu-launcher`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownKind`] when the kind has no table, or
    /// [`RegistryError::UnknownVersion`] when the version is missing from it.
    pub fn dependency(&self, kind: &str, version: &str) -> Result<&VersionInfo, RegistryError> {
        let versions = self
            .dependency_versions
            .get(kind)
            .ok_or_else(|| RegistryError::UnknownKind(kind.to_string()))?;
        versions.get(version).ok_or_else(|| unknown(kind, version))
    }

    /// Dispatch a lookup on the component kind.
    ///
    /// # Errors
    ///
    /// See [`proton`](Self::proton), [`runtime`](Self::runtime) and
    /// [`dependency`](Self::dependency).
    pub fn lookup(&self, kind: ComponentKind, version: &str) -> Result<&VersionInfo, RegistryError> {
        match kind {
            ComponentKind::Proton => self.proton(version),
            ComponentKind::Runtime => self.runtime(version),
            other => self.dependency(other.as_str(), version),
        }
    }

    /// First registered Proton version in key order, if any.
    pub fn first_proton(&self) -> Option<&str> {
        self.proton_versions.keys().next().map(String::as_str)
    }

    /// Editable starting point written when no `runner.json` exists yet.
    pub fn template() -> Self {
        let mut registry = Self::default();
        registry.proton_versions.insert(
            "EDIT_ME".to_string(),
            VersionInfo {
                url: Some("URL_TO_PROTON_TAR".to_string()),
                path: Some(PathBuf::from("OR_PROVIDE_ABSOLUTE_PATH_TO_PROTON_DIR")),
                ..VersionInfo::default()
            },
        );
        registry.runtime_versions.insert(
            "sniper".to_string(),
            VersionInfo {
                url: Some(SNIPER_RUNTIME_URL.to_string()),
                check_for_updates: true,
                ..VersionInfo::default()
            },
        );
        registry.dependency_versions.insert(
            ComponentKind::Dxvk.as_str().to_string(),
            BTreeMap::from([(
                "EDIT_ME".to_string(),
                VersionInfo::from_url("URL_TO_DXVK_TAR"),
            )]),
        );
        registry
    }
}

/// Public beta channel of the Steam Linux Runtime 3.0 ("sniper").
pub const SNIPER_RUNTIME_URL: &str = "https://repo.steampowered.com/steamrt-images-sniper/snapshots/latest-container-runtime-public-beta/SteamLinuxRuntime_sniper.tar.xz";

fn unknown(kind: &str, version: &str) -> RegistryError {
    RegistryError::UnknownVersion {
        kind: kind.to_string(),
        version: version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GlobalRegistry {
        serde_json::from_str(
            r#"{
                "proton_versions": {
                    "GE-Proton9-20": { "url": "https://example.com/GE-Proton9-20.tar.gz" },
                    "local": { "path": "/opt/proton" }
                },
                "runtime_versions": {
                    "sniper": { "url": "https://example.com/sniper/SteamLinuxRuntime_sniper.tar.xz", "check_for_updates": true }
                },
                "dependency_versions": {
                    "dxvk": { "2.4": { "url": "https://example.com/dxvk-2.4.tar.gz" } }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_known_versions() {
        let registry = sample();
        assert_eq!(
            registry.proton("GE-Proton9-20").unwrap().url(),
            Some("https://example.com/GE-Proton9-20.tar.gz")
        );
        assert!(registry.runtime("sniper").unwrap().check_for_updates);
        assert!(registry.dependency("dxvk", "2.4").is_ok());
        assert_eq!(
            registry.proton("local").unwrap().local_path(),
            Some(std::path::Path::new("/opt/proton"))
        );
    }

    #[test]
    fn test_unknown_version_names_the_offender() {
        let registry = sample();
        let err = registry.proton("nonexistent").unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownVersion {
                kind: "proton".to_string(),
                version: "nonexistent".to_string()
            }
        );
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn test_unknown_dependency_kind() {
        let registry = sample();
        assert_eq!(
            registry.lookup(ComponentKind::Vkd3d, "2.12").unwrap_err(),
            RegistryError::UnknownKind("vkd3d".to_string())
        );
        assert!(matches!(
            registry.lookup(ComponentKind::Dxvk, "1.0"),
            Err(RegistryError::UnknownVersion { .. })
        ));
    }

    #[test]
    fn test_empty_url_is_absent() {
        let info = VersionInfo::from_url("");
        assert_eq!(info.url(), None);
    }

    #[test]
    fn test_template_round_trips() {
        let template = GlobalRegistry::template();
        let json = serde_json::to_string_pretty(&template).unwrap();
        let parsed: GlobalRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, template);
        assert_eq!(parsed.first_proton(), Some("EDIT_ME"));
    }
}
