// Driver
//
// Command line definition and the run loop behind `aspxc`.

use crate::compile::{collect_inputs, format_diagnostics, format_summary, parallel_compile, CompileSettings};
use crate::config::{load_parser_config, load_registry};
use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fs;
use std::path::PathBuf;
use webforms_compiler::ParserConfig;

pub fn command() -> Command {
    Command::new("aspxc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parses Web Forms markup (.aspx, .ascx, .master, .skin, .asax) and reports the control tree")
        .arg(
            Arg::new("inputs")
                .value_name("INPUT")
                .num_args(1..)
                .required(true)
                .help("Files, directories or glob patterns, relative to the root"),
        )
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .value_name("DIR")
                .default_value(".")
                .help("Application root that `~/` refers to"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Parser configuration (JSON)"),
        )
        .arg(
            Arg::new("schema")
                .long("schema")
                .value_name("FILE")
                .action(ArgAction::Append)
                .help("Additional type schema lines"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_parser(["summary", "json"])
                .default_value("summary"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the report here instead of stdout"),
        )
        .arg(
            Arg::new("collect-errors")
                .long("collect-errors")
                .action(ArgAction::SetTrue)
                .help("Report every error of a document instead of stopping at the first"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count),
        )
        .arg(Arg::new("log-level").long("log-level").value_name("LEVEL"))
}

/// Run with parsed arguments. Returns the process exit code: 0 when every
/// document parsed, 1 otherwise.
pub fn run(matches: &ArgMatches) -> anyhow::Result<i32> {
    let root = PathBuf::from(matches.get_one::<String>("root").map_or(".", String::as_str));
    let root = root
        .canonicalize()
        .with_context(|| format!("application root {} does not exist", root.display()))?;

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => load_parser_config(&PathBuf::from(path))?,
        None => ParserConfig::default(),
    };
    if matches.get_flag("collect-errors") {
        config = config.with_collect_errors(true);
    }
    let schema_files: Vec<PathBuf> = matches
        .get_many::<String>("schema")
        .map(|v| v.map(PathBuf::from).collect())
        .unwrap_or_default();
    let settings = CompileSettings::new(root.clone(), config).with_registry(load_registry(&schema_files)?);

    let inputs: Vec<String> = matches
        .get_many::<String>("inputs")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    let files = collect_inputs(&root, &inputs)?;
    if files.is_empty() {
        anyhow::bail!("no markup files found under {}", root.display());
    }

    let outcomes = parallel_compile(&files, &settings);
    let report = match matches.get_one::<String>("format").map(String::as_str) {
        Some("json") => serde_json::to_string_pretty(&outcomes).context("cannot serialize the report")?,
        _ => format_summary(&outcomes),
    };
    match matches.get_one::<String>("output") {
        Some(path) => fs::write(path, &report).with_context(|| format!("cannot write {}", path))?,
        None => print!("{}", report),
    }
    eprint!("{}", format_diagnostics(&outcomes));

    Ok(if outcomes.iter().all(|o| o.is_ok()) { 0 } else { 1 })
}
