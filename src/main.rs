//! namepipe CLI Entry Point
//!
//! Shows how a name pattern expands against the files on disk. Pipelines
//! themselves are written as Rust driver programs against the library.
//!
//! # Usage
//!
//! ```bash
//! # One name per concrete match
//! namepipe 'sample.{}.bwa'
//!
//! # Keep the last wildcard unexpanded (one name per group)
//! namepipe 'sample.{}.read.{}' --fix -1
//!
//! # Look in another directory, print JSON
//! namepipe 'sample.{}.read' --working-dir /data/run1 --json
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use log::{debug, info};

use namepipe::{Fix, NamePattern, APP_NAME, VERSION};

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    pattern: Option<String>,
    fix: Vec<Fix>,
    working_dir: Option<PathBuf>,
    json: bool,
    template: bool,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: namepipe [OPTIONS] <PATTERN>");
    println!();
    println!("Arguments:");
    println!("  <PATTERN>           Name pattern, e.g. 'sample.{{}}.read'");
    println!();
    println!("Options:");
    println!("  --fix IDX|LABEL     Keep a wildcard unexpanded (repeatable)");
    println!("  --working-dir PATH  Directory to resolve the pattern in");
    println!("  --json              Print the names as a JSON array");
    println!("  --template          Also print the pattern template");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  namepipe 'sample.{{}}.bwa'");
    println!("  namepipe 'sample.{{}}.read.{{}}' --fix -1");
}

/// Parses a `--fix` value: an integer index or a wildcard label.
fn parse_fix(value: &str) -> Fix {
    match value.parse::<isize>() {
        Ok(index) => Fix::Index(index),
        Err(_) => Fix::Label(value.to_string()),
    }
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--json" => config.json = true,
            "--template" => config.template = true,
            "--verbose" | "-v" => config.verbose = true,
            "--fix" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| "--fix requires an index or label".to_string())?;
                config.fix.push(parse_fix(value));
            }
            "--working-dir" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| "--working-dir requires a path argument".to_string())?;
                config.working_dir = Some(PathBuf::from(value));
            }
            arg if arg.starts_with("--") => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.pattern.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.pattern = Some(arg.clone());
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Validates and changes into the working directory.
fn setup_working_directory(working_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(dir) = working_dir else {
        debug!("Working directory: {}", env::current_dir()?.display());
        return Ok(());
    };

    if !dir.is_dir() {
        return Err(format!("Not a directory: {}", dir.display()).into());
    }

    env::set_current_dir(&dir)?;
    info!("Working directory: {}", env::current_dir()?.display());
    Ok(())
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    setup_working_directory(config.working_dir)?;

    let Some(text) = config.pattern else {
        print_usage();
        return Err("missing <PATTERN>".into());
    };

    let pattern = NamePattern::parse(&text)?;
    let names = pattern.list(&config.fix)?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    if config.template {
        println!("{} {}", "template:".bold(), pattern.template());
    }
    for name in &names {
        println!("{}", name);
    }
    info!(
        "{}",
        format!("{} names for '{}'", names.len(), pattern).green()
    );

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("namepipe")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_pattern_and_fix() {
        let config = parse_arguments(&args(&["s.{}.read.{}", "--fix", "-1", "--fix", "sample"])).unwrap();
        assert_eq!(config.pattern.as_deref(), Some("s.{}.read.{}"));
        assert_eq!(
            config.fix,
            vec![Fix::Index(-1), Fix::Label("sample".to_string())]
        );
    }

    #[test]
    fn test_parse_flags() {
        let config = parse_arguments(&args(&["--json", "--template", "-v", "a.{}", "--working-dir", "/tmp"])).unwrap();
        assert!(config.json);
        assert!(config.template);
        assert!(config.verbose);
        assert_eq!(config.working_dir, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_arguments(&args(&["--fix"])).is_err());
        assert!(parse_arguments(&args(&["--bogus"])).is_err());
        assert!(parse_arguments(&args(&["a", "b"])).is_err());
    }
}
