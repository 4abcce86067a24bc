use anyhow::{Context, bail};
use fs2::FileExt;
use std::fs::File;

/// Takes an exclusive lock so only one window talks to the daemon.
///
/// The lock lives as long as the returned file.
pub fn acquire_app_lock() -> anyhow::Result<File> {
    let mut lock_path = dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(std::env::temp_dir);
    lock_path.push("cmrs.lock");

    let file = File::create(&lock_path)
        .with_context(|| format!("failed to create lock file {}", lock_path.display()))?;

    if file.try_lock_exclusive().is_err() {
        bail!("another instance of cmrs is already running");
    }

    Ok(file)
}
