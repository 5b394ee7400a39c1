//! File system watcher for live reload.
//!
//! Watches the content, template and static directories and the config
//! file; a quiet period after a burst of changes triggers one full rebuild.
//!
//! ```text
//! notify events ──► Debouncer (300ms) ──► handle_changes()
//!                        ▲                     │
//!                        │                     ├── config changed? reload_config()
//!                        │                     ├── build_site()
//!                        │                     └── bump_generation()
//!                        └── events queued during the rebuild
//!                            (drained into one pending batch)
//! ```
//!
//! Builds never overlap: a rebuild runs to completion, and whatever changed
//! meanwhile is collected into the next batch.

use crate::{
    build::build_site,
    config::{SiteConfig, cfg, reload_config},
    log,
    logger::WatchStatus,
    serve::bump_generation,
    utils::category::{FileCategory, categorize_path},
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::{Duration, Instant},
};

const DEBOUNCE_MS: u64 = 300;

/// Watched locations, most specific first.
const WATCH_CATEGORIES: &[FileCategory] = &[
    FileCategory::Config,
    FileCategory::Template,
    FileCategory::Static,
    FileCategory::Content,
];

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with(".#")
}

/// Path relative to the project root, for log display.
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events until they have been quiet for [`DEBOUNCE_MS`].
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

/// Move every event already queued into the debouncer without blocking.
fn drain_queued(rx: &Receiver<notify::Result<Event>>, debouncer: &mut Debouncer) {
    while let Ok(message) = rx.try_recv() {
        if let Ok(event) = message
            && is_relevant(&event)
        {
            debouncer.add(event);
        }
    }
}

// =============================================================================
// Event Handler
// =============================================================================

/// Rebuild for a batch of changed paths. Returns whether a build ran.
fn handle_changes(paths: &[PathBuf], status: &mut WatchStatus) -> bool {
    let config = cfg();
    let root = config.get_root().to_path_buf();

    let mut config_changed = false;
    let mut triggers = Vec::new();
    for path in paths {
        let category = categorize_path(path, &config);
        config_changed |= category == FileCategory::Config;
        if category.triggers_rebuild() {
            triggers.push(rel_path(path, &root));
        }
    }
    if triggers.is_empty() {
        return false;
    }
    triggers.sort();

    if config_changed {
        match reload_config() {
            Ok(true) => log!("watch"; "config reloaded"),
            Ok(false) => {}
            Err(e) => {
                status.error("config reload failed", &format!("{e:#}"));
                return false;
            }
        }
    }

    let summary = match triggers.as_slice() {
        [one] => one.clone(),
        [first, rest @ ..] => format!("{first} and {} more", rest.len()),
        [] => String::new(),
    };

    match build_site(&cfg()) {
        Ok(result) if result.has_errors() => {
            status.error(&format!("{summary}: {} error(s)", result.errors), "");
        }
        Ok(result) if result.files_generated + result.tag_pages_generated == 0 => {
            status.unchanged(&format!("{summary}: nothing to rebuild"));
        }
        Ok(result) => {
            status.success(&format!("{summary}: {} page(s) rebuilt", result.files_generated));
        }
        Err(e) => {
            status.error(&format!("{summary}: build failed"), &format!("{e:#}"));
            return false;
        }
    }
    bump_generation();
    true
}

// =============================================================================
// Watcher Setup
// =============================================================================

fn setup_watchers(watcher: &mut impl Watcher, config: &SiteConfig) -> Result<()> {
    let mut watched: Vec<PathBuf> = Vec::new();

    for &category in WATCH_CATEGORIES {
        let Some(path) = category.path(config) else {
            continue;
        };
        // Nested directories are covered by an outer recursive watch
        if !path.exists() || watched.iter().any(|outer| path.starts_with(outer) && outer.is_dir()) {
            continue;
        }

        let mode = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&path, mode)
            .with_context(|| format!("Failed to watch {}: {}", category.name(), path.display()))?;

        log!("watch"; "{}: {}", category.name(), rel_path(&path, config.get_root()));
        watched.push(path);
    }
    Ok(())
}

// =============================================================================
// Public API
// =============================================================================

/// Start blocking file watcher with debouncing and live rebuild.
pub fn watch_for_changes_blocking() -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, &cfg())?;

    let mut debouncer = Debouncer::new();
    let mut status = WatchStatus::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                handle_changes(&debouncer.take(), &mut status);
                drain_queued(&rx, &mut debouncer);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }

    Ok(())
}
