//! Systemd user unit install/uninstall

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tether_util::{SERVICE_UNIT_NAME, systemd_user_unit_dir};
use tracing::info;

/// Render the unit file contents for this binary and config path.
fn render_unit(exe: &Path, config_path: &Path) -> String {
    format!(
        "[Unit]\n\
         Description=Presence-driven companion supervisor\n\
         After=bluetooth.target\n\
         \n\
         [Service]\n\
         ExecStart={exe} --config {config} run\n\
         Restart=on-failure\n\
         RestartSec=5\n\
         \n\
         [Install]\n\
         WantedBy=default.target\n",
        exe = exe.display(),
        config = config_path.display(),
    )
}

/// Write the unit into the systemd user directory.
///
/// Returns the unit path; enabling it is left to the user
/// (`systemctl --user enable --now tetherd`).
pub fn install(config_path: &Path) -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to resolve current executable")?;
    install_at(&systemd_user_unit_dir(), &exe, config_path)
}

/// Remove a previously installed unit. Returns the removed path, or
/// `None` if no unit was installed.
pub fn uninstall() -> Result<Option<PathBuf>> {
    uninstall_at(&systemd_user_unit_dir())
}

fn install_at(unit_dir: &Path, exe: &Path, config_path: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(unit_dir)
        .with_context(|| format!("Failed to create {}", unit_dir.display()))?;

    let unit_path = unit_dir.join(SERVICE_UNIT_NAME);
    std::fs::write(&unit_path, render_unit(exe, config_path))
        .with_context(|| format!("Failed to write {}", unit_path.display()))?;

    info!(unit = %unit_path.display(), "Service unit installed");
    Ok(unit_path)
}

fn uninstall_at(unit_dir: &Path) -> Result<Option<PathBuf>> {
    let unit_path = unit_dir.join(SERVICE_UNIT_NAME);
    match std::fs::remove_file(&unit_path) {
        Ok(()) => {
            info!(unit = %unit_path.display(), "Service unit removed");
            Ok(Some(unit_path))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", unit_path.display())),
    }
}
