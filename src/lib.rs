// Library exports for pangene
pub mod classify;
pub mod error;
pub mod format_io;
pub mod graph;
pub mod grouping;
pub mod hit;
pub mod options;
pub mod paf;
pub mod seq_registry;

pub use error::{PangeneError, Result};
