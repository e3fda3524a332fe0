//! Tabular exports
//!
//! Two table formats consumed by downstream enrichment tooling: `.rnk`
//! (ranked feature scores) and `.gct` (the full gradient matrix). Both can
//! render to an in-memory string or persist to disk; the pipeline keeps
//! runs without an output directory free of filesystem writes.

mod gct;
mod rnk;

pub use gct::{render_gct, write_gct};
pub use rnk::{render_rnk, write_rnk};
