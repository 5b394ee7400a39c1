//! Global config with atomic reload support.
//!
//! Uses `arc-swap` for lock-free reads and atomic config replacement, so
//! the watcher can swap in a new `oxen.toml` while rayon workers keep the
//! snapshot they started with.
//!
//! ```text
//!   worker ──► cfg() ──┐
//!   worker ──► cfg() ──┼──► ArcSwap<SiteConfig> ◄── reload_config() ◄── watcher
//!   server ──► cfg() ──┘
//! ```

use super::SiteConfig;
use arc_swap::ArcSwap;
use rustc_hash::FxHasher;
use std::{
    fs,
    hash::Hasher,
    sync::{
        Arc, LazyLock,
        atomic::{AtomicU64, Ordering},
    },
};

/// Global config storage, replaced with the loaded config in main.
pub static CONFIG: LazyLock<ArcSwap<SiteConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(SiteConfig::default()));

/// Hash of the config source the current config was loaded from.
static CONFIG_HASH: AtomicU64 = AtomicU64::new(0);

/// Get current config as `Arc<SiteConfig>`. Wait-free.
#[inline]
pub fn cfg() -> Arc<SiteConfig> {
    CONFIG.load_full()
}

fn content_hash(content: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(content.as_bytes());
    hasher.finish()
}

/// Replace config atomically after `oxen.toml` changed on disk.
///
/// Returns `true` if config was actually updated, `false` if content matches
/// the last load. Readers holding the previous `Arc` are unaffected.
///
/// # Errors
///
/// Returns error if the file cannot be read or fails to parse or validate;
/// the previous config stays active in that case.
pub fn reload_config() -> anyhow::Result<bool> {
    let c = cfg();
    let Some(cli) = c.cli else {
        anyhow::bail!("config was not initialized from the command line");
    };

    let content = fs::read_to_string(&c.config_path)?;
    let new_hash = content_hash(&content);
    if new_hash == CONFIG_HASH.load(Ordering::Relaxed) {
        return Ok(false);
    }

    let new_config = SiteConfig::load(cli)?;
    CONFIG.store(Arc::new(new_config));
    CONFIG_HASH.store(new_hash, Ordering::Relaxed);

    Ok(true)
}

/// Initialize global config (called once at startup).
pub fn init_config(config: SiteConfig) {
    if let Ok(content) = fs::read_to_string(&config.config_path) {
        CONFIG_HASH.store(content_hash(&content), Ordering::Relaxed);
    }
    CONFIG.store(Arc::new(config));
}
