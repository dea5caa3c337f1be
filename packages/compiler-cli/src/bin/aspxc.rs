/**
 * Web Forms Compiler CLI - aspxc
 *
 * Parses markup documents in parallel and reports trees or diagnostics
 */
use std::process;
use webforms_compiler_cli::driver::{command, run};
use webforms_compiler_cli::logging::{level_from_args, ConsoleLogger};

fn main() {
    let matches = command().get_matches();

    let verbose = matches.get_count("verbose");
    let level = match level_from_args(verbose, matches.get_one::<String>("log-level").map(String::as_str)) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };
    if let Err(e) = ConsoleLogger::init(level) {
        eprintln!("Error: {}", e);
    }

    match run(&matches) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}
