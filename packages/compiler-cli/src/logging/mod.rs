// Logging
//
// Console backend for the `log` facade used by the compiler.

pub mod console_logger;

pub use console_logger::{level_from_args, ConsoleLogger};
