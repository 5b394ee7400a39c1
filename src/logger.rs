//! Logging utilities with colored output and progress bars.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro that only prints when `--verbose` is set
//! - `Progress` for an in-place progress bar during a parallel phase
//! - `WatchStatus` for the single-line status shown while watching
//!
//! # Example
//!
//! ```ignore
//! log!("discover"; "found {} documents", count);
//! debug!("discover"; "duplicate id {}", id);
//!
//! if let Some(progress) = Progress::new("render", 100) {
//!     progress.inc();
//! }
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{Write, stdout},
    sync::{
        Mutex, OnceLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

/// Whether a progress line currently occupies the last terminal row
static PROGRESS_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Global verbose flag, set once from the CLI
static VERBOSE: AtomicBool = AtomicBool::new(false);

// Progress line layout: "[render] [████░░░░] 42/100"

const MIN_BAR_WIDTH: usize = 10;
const MAX_BAR_WIDTH: usize = 40;

/// Columns taken by `[module] `.
#[inline]
const fn prefix_len(module_len: usize) -> usize {
    module_len + 3
}

/// Get terminal width, cached after first call.
/// Falls back to 120 columns if detection fails.
fn get_terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

/// Enable or disable `debug!` output.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

#[inline]
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like `log!`, but silent unless verbose mode is on.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Progress
// ============================================================================

/// A progress bar redrawn in place on the last terminal line.
///
/// Workers call [`Progress::inc`] concurrently; redraws are serialized.
/// `log!` output printed meanwhile appears above the bar.
pub struct Progress {
    module: &'static str,
    total: usize,
    done: AtomicUsize,
    lock: Mutex<()>,
}

impl Progress {
    /// Returns `None` when there is at most one item to process.
    pub fn new(module: &'static str, total: usize) -> Option<Self> {
        if total <= 1 {
            return None;
        }
        PROGRESS_ACTIVE.store(true, Ordering::SeqCst);
        Some(Self {
            module,
            total,
            done: AtomicUsize::new(0),
            lock: Mutex::new(()),
        })
    }

    pub fn inc(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let _guard = self.lock.lock().ok();

        let line = render_bar(self.module, done, self.total, get_terminal_width() as usize);
        let mut stdout = stdout().lock();
        execute!(stdout, Clear(ClearType::CurrentLine)).ok();
        write!(stdout, "\r{line}").ok();
        stdout.flush().ok();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if PROGRESS_ACTIVE.swap(false, Ordering::SeqCst) {
            let mut stdout = stdout().lock();
            execute!(stdout, Clear(ClearType::CurrentLine)).ok();
            write!(stdout, "\r").ok();
            stdout.flush().ok();
        }
    }
}

/// One progress line, sized to `width` columns.
fn render_bar(module: &str, done: usize, total: usize, width: usize) -> String {
    let count = format!("{}/{}", done.min(total), total);
    let overhead = prefix_len(module.len()) + 3 + count.len();
    let bar_width = width.saturating_sub(overhead).clamp(MIN_BAR_WIDTH, MAX_BAR_WIDTH);

    let filled = if total > 0 { done.min(total) * bar_width / total } else { 0 };
    let bar = "█".repeat(filled) + &"░".repeat(bar_width - filled);

    format!("{} [{bar}] {count}", colorize_prefix(module, &module.to_ascii_lowercase()))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix.
///
/// Long single-line messages are cut to the terminal width.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module, &module.to_ascii_lowercase());
    let width = get_terminal_width() as usize;

    let mut stdout = stdout().lock();
    if PROGRESS_ACTIVE.load(Ordering::SeqCst) {
        // Overwrite the bar; the next `inc` redraws it below
        execute!(stdout, Clear(ClearType::CurrentLine)).ok();
        write!(stdout, "\r").ok();
    }

    if message.contains('\n') {
        writeln!(stdout, "{prefix} {message}").ok();
    } else {
        let max_len = width.saturating_sub(prefix_len(module.len()));
        writeln!(stdout, "{prefix} {}", truncate_str(message, max_len)).ok();
    }
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "serve" => prefix.bright_blue().bold(),
        "watch" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        "warn" => prefix.bright_magenta().bold(),
        "render" | "aggregate" => prefix.bright_cyan().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Truncate a string to fit within `max_len` bytes on a char boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ============================================================================
// Watch Status (single-line status with overwrite)
// ============================================================================

/// Current local time as HH:MM:SS
fn now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Single-line status display for watch mode.
///
/// Each message overwrites the previous one so a long watch session
/// keeps a compact terminal.
pub struct WatchStatus {
    /// Lines of previous output to clear
    last_lines: usize,
}

impl WatchStatus {
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str) {
        self.display("✓".green().to_string(), message);
    }

    /// Display unchanged message (dimmed).
    pub fn unchanged(&mut self, message: &str) {
        self.display(String::new(), &message.dimmed().to_string());
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        self.display("✗".red().to_string(), &message);
    }

    fn display(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed();
        let line = if symbol.is_empty() {
            format!("{timestamp} {message}")
        } else {
            format!("{timestamp} {symbol} {message}")
        };

        writeln!(stdout, "{line}").ok();
        stdout.flush().ok();

        self.last_lines = line_count(message);
    }
}

/// Number of terminal lines a status message occupies.
fn line_count(message: &str) -> usize {
    message.matches('\n').count() + 1
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_len() {
        assert_eq!(prefix_len("render".len()), "[render] ".len());
    }

    #[test]
    fn test_render_bar() {
        colored::control::set_override(false);
        assert_eq!(render_bar("render", 5, 10, 0), format!("[render] [{}{}] 5/10", "█".repeat(5), "░".repeat(5)));
        // Width is clamped to the maximum bar size
        let wide = render_bar("render", 10, 10, 500);
        assert!(wide.contains(&"█".repeat(MAX_BAR_WIDTH)));
        assert!(wide.ends_with("] 10/10"));
    }

    #[test]
    fn test_truncate_str_ascii() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello", 5), "hello");
        assert_eq!(truncate_str("hello world", 5), "hello");
        assert_eq!(truncate_str("hello", 0), "");
    }

    #[test]
    fn test_truncate_str_unicode_boundary() {
        // "€" is 3 bytes; cutting inside it backs off to the previous boundary
        assert_eq!(truncate_str("€€", 4), "€");
        assert_eq!(truncate_str("a€b", 3), "a");
        assert_eq!(truncate_str("a€b", 4), "a€");
    }

    #[test]
    fn test_verbose_flag() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }

    #[test]
    fn test_progress_skips_trivial_work() {
        assert!(Progress::new("discover", 1).is_none());
        assert!(Progress::new("discover", 0).is_none());
    }

    #[test]
    fn test_watch_status_line_count() {
        assert_eq!(WatchStatus::new().last_lines, 0);
        assert_eq!(line_count("rebuilt 3 pages"), 1);
        assert_eq!(line_count("build failed\nnotes/a.org: template error"), 2);
    }
}
