//! Load-or-create for `runner.json` and per-application specs.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use yapl_core::Layout;
use yapl_schema::{AppSpec, GlobalRegistry};

use crate::Target;
use crate::ops::OpsError;
use crate::ui::Output;

/// Proton version written into a new spec when the registry lists none.
pub const UNSET_PROTON: &str = "PLEASE_SET_A_VERSION_FROM_RUNNER.JSON";

/// Whether a document was read from disk or just written with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Loaded,
    Created,
}

/// Read `runner.json`, writing [`GlobalRegistry::template`] first if absent.
pub fn load_or_create_registry(
    layout: &Layout,
    output: &Output,
) -> Result<(GlobalRegistry, Origin), OpsError> {
    let path = layout.registry_file();
    if let Some(registry) = read_json(&path)? {
        return Ok((registry, Origin::Loaded));
    }

    output.info("No global 'runner.json' found. Creating a default one.");
    let registry = GlobalRegistry::template();
    write_json(&path, &registry)?;
    output.success("Default runner.json created. Edit it with download URLs or local paths.");
    Ok((registry, Origin::Created))
}

/// Read the target's spec, writing [`AppSpec::template`] first if absent.
///
/// The template pins the first registered Proton version.
pub fn load_or_create_app(
    layout: &Layout,
    target: &Target,
    registry: &GlobalRegistry,
    output: &Output,
) -> Result<(AppSpec, Origin), OpsError> {
    let path = layout.app_config(target.kind, &target.name);
    if let Some(app) = read_json(&path)? {
        return Ok((app, Origin::Loaded));
    }

    let config_name = target.kind.config_file();
    output.info(&format!(
        "No config found. Creating a default '{config_name}' in '{target}'."
    ));
    std::fs::create_dir_all(layout.app_dir(target.kind, &target.name))?;
    let app = AppSpec::template(registry.first_proton().unwrap_or(UNSET_PROTON));
    write_json(&path, &app)?;
    output.success(&format!("Default {config_name} created."));
    Ok((app, Origin::Created))
}

/// `None` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, OpsError> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    debug!("Loading {}", path.display());
    serde_json::from_str(&data)
        .map(Some)
        .map_err(|source| OpsError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OpsError> {
    let mut data = serde_json::to_string_pretty(value).map_err(|source| OpsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    data.push('\n');
    std::fs::write(path, data)?;
    Ok(())
}
