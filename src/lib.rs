//! Renders the SVG plots and the summary of a PNG codec benchmark run from the cache files the
//! benchmark harness leaves behind.

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

#[macro_use]
mod macros_private;

pub mod cache;
pub mod config;
pub mod format;
pub mod model;
pub mod plot;
pub mod report;
pub mod stats;
pub mod svg;

lazy_static! {
    static ref DEBUG_ENABLED: bool = std::env::var_os("PNGBENCH_DEBUG").is_some();
}

/// Whether `PNGBENCH_DEBUG` is set. Enables maximum logging and plot configuration dumps.
pub fn debug_enabled() -> bool {
    *DEBUG_ENABLED
}
