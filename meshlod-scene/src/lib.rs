//! Scene graphs and model-level optimization for meshlod
//!
//! A [`Scene`] is an arena of nodes carrying transforms and references to
//! shared geometry. On top of it this crate provides:
//! - [`optimize_scene`], which simplifies every referenced geometry once
//! - [`ModelSession`], holding a loaded model next to its optimized copy
//! - [`OptimizationWorker`], a background thread that only ever runs the
//!   most recent request

pub mod scene;
pub mod optimize;
pub mod session;
pub mod worker;

pub use scene::*;
pub use optimize::*;
pub use session::*;
pub use worker::*;
