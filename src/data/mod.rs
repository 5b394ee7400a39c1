//! Site-wide data built by the discovery phase.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Two-Phase Build                                │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  Discovery (parallel)                                               │
//! │  ┌────────────┐     ┌──────────────┐     ┌───────────────────────┐  │
//! │  │ parse .org │ ──► │ extract meta │ ──► │ IdentifierIndex       │  │
//! │  │ (per file) │     │ + ids + tags │     │ TagIndex  (shared)    │  │
//! │  └────────────┘     └──────────────┘     └───────────────────────┘  │
//! │                                                                     │
//! │  ════════════════════════ barrier ═══════════════════════════════   │
//! │                                                                     │
//! │  Rendering (parallel)                                               │
//! │  ┌────────────┐     ┌───────────────────────┐     ┌─────────────┐   │
//! │  │ owned tree │ ──► │ IdentifierIndex.lookup│ ──► │ Write HTML  │   │
//! │  └────────────┘     │ (read-only)           │     └─────────────┘   │
//! │                     └───────────────────────┘                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

mod identifier;
mod index;
mod types;

pub use identifier::{Identifier, InvalidIdentifier, is_valid_identifier};
pub use index::{IdentifierIndex, TagIndex};
pub use types::{DocumentMeta, DocumentSummary, HeaderLocation};
