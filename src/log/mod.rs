use crate::config::Config;
use fs_err as fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Installs the global fmt subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing(debug: bool) {
    let default = if debug { "sitecraft=debug,info" } else { "sitecraft=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}

pub fn tx_dir(root: &Path, tx: Uuid) -> PathBuf {
    root.join(".sitecraft").join("tx").join(tx.to_string())
}

fn write_artifacts(dir: &Path, prompt: &str, raw: &str) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("prompt.txt"), prompt)?;
    fs::write(dir.join("response.txt"), raw)?;
    Ok(())
}

/// Keeps the exact prompt and raw model text for a transaction. Failures are
/// logged and otherwise ignored.
pub fn save_artifacts(cfg: &Config, tx: Uuid, prompt: &str, raw: &str) {
    let dir = tx_dir(Path::new(&cfg.root), tx);
    match write_artifacts(&dir, prompt, raw) {
        Ok(()) => tracing::debug!(%tx, dir = %dir.display(), "saved generation artifacts"),
        Err(e) => tracing::warn!(%tx, error = %e, "could not save generation artifacts"),
    }
}
