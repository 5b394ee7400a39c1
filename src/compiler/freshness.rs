//! Output freshness checks.
//!
//! The output file's modification time is the only persisted cache signal.
//! An output is fresh when it is at least as new as every input that went
//! into it: the source(s) and the reference template time.

use std::{fs, path::Path, time::SystemTime};

/// Whether an existing output (`output`) still reflects `source` and `template`.
#[inline]
pub fn is_fresh(source: SystemTime, template: SystemTime, output: Option<SystemTime>) -> bool {
    output.is_some_and(|out| out >= source && out >= template)
}

/// [`is_fresh`] for pages built from many sources.
///
/// Any contributor changing invalidates the page, so the newest contributor
/// is the one compared against.
pub fn is_fresh_aggregate<I>(contributors: I, template: SystemTime, output: Option<SystemTime>) -> bool
where
    I: IntoIterator<Item = SystemTime>,
{
    let newest = contributors
        .into_iter()
        .max()
        .unwrap_or(SystemTime::UNIX_EPOCH);
    is_fresh(newest, template, output)
}

/// Modification time of `path`, `None` if it does not exist.
pub fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
