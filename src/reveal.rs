//! Opening the output folder in the desktop file browser

use std::{path::Path, process::Command};

use log::{debug, warn};

#[cfg(target_os = "macos")]
const FILE_BROWSER: &str = "open";

#[cfg(target_os = "windows")]
const FILE_BROWSER: &str = "explorer";

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const FILE_BROWSER: &str = "xdg-open";

/// Shows `dir` in the platform file browser
///
/// Best-effort: failures are logged as warnings and never change the outcome
/// of a run. Returns whether the browser was launched successfully.
pub fn reveal_directory(dir: &Path) -> bool {
    reveal_with(FILE_BROWSER, dir)
}

fn reveal_with(program: &str, dir: &Path) -> bool {
    if !dir.is_dir() {
        warn!("Output folder \"{}\" does not exist, not opening it.", dir.display());
        return false;
    }

    match Command::new(program).arg(dir).status() {
        // explorer.exe reports failure even when the window opens
        Ok(status) if status.success() || cfg!(target_os = "windows") => {
            debug!("Opened \"{}\" with {}", dir.display(), program);
            true
        }
        Ok(status) => {
            warn!("{} exited with {} while opening \"{}\".", program, status, dir.display());
            false
        }
        Err(err) => {
            warn!("Unable to run {} to open \"{}\": {}", program, dir.display(), err);
            false
        }
    }
}
