//! Custom DXVK / VKD3D-Proton DLL installation into a prefix.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use yapl_schema::{AppDependencies, ComponentKind, DxvkMode};

use crate::Layout;
use crate::launch::LaunchWarning;

/// DLLs VKD3D-Proton provides.
pub const VKD3D_DLLS: &[&str] = &["d3d12.dll", "d3d12core.dll"];

/// DLLs DXVK provides for a Direct3D level (`9`, `10` or `11`).
pub fn dxvk_dlls(directx_level: &str) -> &'static [&'static str] {
    match directx_level {
        "9" => &["d3d9.dll"],
        "10" => &[
            "d3d10.dll",
            "d3d10_1.dll",
            "d3d10core.dll",
            "d3d11.dll",
            "dxgi.dll",
        ],
        "11" => &["d3d11.dll", "dxgi.dll"],
        _ => &[],
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DllReport {
    pub installed: Vec<PathBuf>,
    pub warnings: Vec<LaunchWarning>,
}

/// Copy the selected DLLs from `dependencies/<kind>/<version>/x64` into
/// `<prefix>/drive_c/<install_path>`.
///
/// Does nothing unless `dxvk_mode` is `custom`. A component without a
/// version, install path or DLL list is skipped. Each failed copy becomes a
/// warning; only failing to create a destination directory is an error.
pub fn install_custom_dlls(
    layout: &Layout,
    prefix: &Path,
    deps: &AppDependencies,
) -> std::io::Result<DllReport> {
    let mut report = DllReport::default();
    if deps.dxvk_mode != DxvkMode::Custom {
        return Ok(report);
    }

    let dxvk = dxvk_dlls(deps.dxvk_directx_version.as_deref().unwrap_or_default());
    install(
        layout,
        prefix,
        ComponentKind::Dxvk,
        deps.dxvk_version.as_deref(),
        deps.dxvk_install_path.as_deref(),
        dxvk,
        &mut report,
    )?;
    install(
        layout,
        prefix,
        ComponentKind::Vkd3d,
        deps.vkd3d_version.as_deref(),
        deps.vkd3d_install_path.as_deref(),
        VKD3D_DLLS,
        &mut report,
    )?;
    Ok(report)
}

fn install(
    layout: &Layout,
    prefix: &Path,
    kind: ComponentKind,
    version: Option<&str>,
    install_path: Option<&str>,
    dlls: &[&str],
    report: &mut DllReport,
) -> std::io::Result<()> {
    let (Some(version), Some(install_path)) = (
        version.filter(|v| !v.is_empty()),
        install_path.filter(|p| !p.is_empty()),
    ) else {
        return Ok(());
    };
    if dlls.is_empty() {
        return Ok(());
    }

    info!("Installing custom {kind} DLLs into drive_c/{install_path}");
    let source = layout.dependency_dir(kind.as_str(), version).join("x64");
    let dest = prefix.join("drive_c").join(install_path);
    std::fs::create_dir_all(&dest)?;

    for dll in dlls {
        let target = dest.join(dll);
        match std::fs::copy(source.join(dll), &target) {
            Ok(_) => report.installed.push(target),
            Err(e) => {
                warn!("Failed to copy {dll}: {e}");
                report.warnings.push(LaunchWarning::DllCopy {
                    dll: (*dll).to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(())
}
