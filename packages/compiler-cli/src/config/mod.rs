pub mod project;

pub use project::{load_parser_config, load_registry};
