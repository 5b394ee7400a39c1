//! Build counters.
//!
//! Every unit of work produces its own [`BuildResult`]; results are only ever
//! combined with `+`, so the totals do not depend on completion order.

use std::{
    iter::Sum,
    ops::{Add, AddAssign},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub files_scanned: usize,
    pub files_with_identifiers: usize,
    pub files_generated: usize,
    pub files_skipped: usize,
    pub errors: usize,
    pub tag_pages_generated: usize,
    pub static_files_copied: usize,
}

impl BuildResult {
    pub fn scanned(with_identifiers: bool) -> Self {
        Self {
            files_scanned: 1,
            files_with_identifiers: usize::from(with_identifiers),
            ..Self::default()
        }
    }

    pub fn generated() -> Self {
        Self {
            files_generated: 1,
            ..Self::default()
        }
    }

    pub fn skipped() -> Self {
        Self {
            files_skipped: 1,
            ..Self::default()
        }
    }

    pub fn error() -> Self {
        Self {
            errors: 1,
            ..Self::default()
        }
    }

    pub fn tag_page() -> Self {
        Self {
            tag_pages_generated: 1,
            ..Self::default()
        }
    }

    pub fn static_copied() -> Self {
        Self {
            static_files_copied: 1,
            ..Self::default()
        }
    }

    pub const fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

impl Add for BuildResult {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            files_scanned: self.files_scanned + rhs.files_scanned,
            files_with_identifiers: self.files_with_identifiers + rhs.files_with_identifiers,
            files_generated: self.files_generated + rhs.files_generated,
            files_skipped: self.files_skipped + rhs.files_skipped,
            errors: self.errors + rhs.errors,
            tag_pages_generated: self.tag_pages_generated + rhs.tag_pages_generated,
            static_files_copied: self.static_files_copied + rhs.static_files_copied,
        }
    }
}

impl AddAssign for BuildResult {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for BuildResult {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
