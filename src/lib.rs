//! Type-directed copying of term graphs, for a runtime with a bump-allocated heap.
//!

pub mod data;

pub mod types;

pub mod copy;

pub mod term;

#[cfg(feature = "render")]
mod render;
#[cfg(feature = "render")]
pub use render::{render_terms, save_graph, RenderStats, Root};
