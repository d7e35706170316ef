//! Append-only notification logs.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::StorageSettings;
use crate::notify::notification::Notification;

/// Target used for storage failures. The notification center does not turn
/// these into notifications, since recording them would fail again.
pub const STORE_TARGET: &str = "notify::store";

pub const FULL_LOG: &str = "notifications.log";
pub const WARNINGS_LOG: &str = "warnings.log";

/// Picks the preferred mount if it exists, else the working directory, and
/// creates the log folder inside it.
pub fn resolve_storage(settings: &StorageSettings) -> io::Result<PathBuf> {
    create_folder(settings, std::env::current_dir)
}

pub(crate) fn resolve_storage_in(settings: &StorageSettings, fallback: &Path) -> io::Result<PathBuf> {
    create_folder(settings, || Ok(fallback.to_path_buf()))
}

fn create_folder(
    settings: &StorageSettings,
    fallback: impl FnOnce() -> io::Result<PathBuf>,
) -> io::Result<PathBuf> {
    let mount = Path::new(&settings.preferred_mount);
    let base = if !settings.preferred_mount.is_empty() && mount.is_dir() {
        mount.to_path_buf()
    } else {
        fallback()?
    };

    let folder = base.join(&settings.log_folder);
    fs::create_dir_all(&folder)?;
    info!("Storing notifications in {}", folder.display());
    Ok(folder)
}

/// Writes each warning and error as one JSON line to the full log and to the
/// warnings log. Every call opens, writes and closes the files.
#[derive(Debug, Clone)]
pub struct NotificationStore {
    full: PathBuf,
    warnings: PathBuf,
}

impl NotificationStore {
    pub fn new(folder: &Path) -> Self {
        Self {
            full: folder.join(FULL_LOG),
            warnings: folder.join(WARNINGS_LOG),
        }
    }

    pub fn full_log(&self) -> &Path {
        &self.full
    }

    pub fn warnings_log(&self) -> &Path {
        &self.warnings
    }

    pub fn append(&self, notification: &Notification) {
        let line = match serde_json::to_string(notification) {
            Ok(line) => line,
            Err(e) => {
                error!(target: STORE_TARGET, "Failed to serialize notification: {e}");
                return;
            }
        };

        for path in [&self.full, &self.warnings] {
            if let Err(e) = append_line(path, &line) {
                error!(target: STORE_TARGET, "Failed to write {}: {e}", path.display());
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
