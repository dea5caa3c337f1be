pub mod parallel;
pub mod report;

pub use parallel::{collect_inputs, compile_file, parallel_compile, virtual_path_for, CompileSettings, FileOutcome};
pub use report::{count_controls, format_diagnostics, format_summary};
