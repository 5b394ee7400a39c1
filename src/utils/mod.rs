//! Utility modules shared by the build, server and watcher.

pub mod category;
pub mod path;
