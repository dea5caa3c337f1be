#![deny(clippy::all)]

/**
 * Web Forms Compiler CLI
 *
 * Batch front end for the markup parser
 */
pub use webforms_compiler as compiler;

pub mod compile;
pub mod config;
pub mod driver;
pub mod logging;

/// CLI version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
