//! Config Weaver CLI
//!
//! Usage:
//!   config-weaver [OPTIONS] [CONFIG_DIR]
//!
//! Loads a directory of YAML configuration files (plus prefixed environment
//! variables), resolves all `{{ ... }}` references, and prints the resolved
//! configuration as YAML on stdout. With no directory, reads one YAML
//! document from stdin and resolves it.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use config_weaver::{ConfigContext, ConfigLoader, Resolver, Value};

#[derive(Parser)]
#[command(name = "config-weaver")]
#[command(about = "Self-referential configuration resolver")]
struct Cli {
    /// Directory of YAML configuration files (reads stdin if not provided)
    config_dir: Option<PathBuf>,

    /// Load only these files from the directory (default: every *.yaml)
    #[arg(short, long)]
    file: Vec<String>,

    /// Environment variable prefix merged under the `env` key
    #[arg(short, long, default_value = config_weaver::config::DEFAULT_ENV_PREFIX)]
    env_prefix: String,

    /// Maximum rendering passes before giving up
    #[arg(long, default_value_t = config_weaver::MAX_ITERATIONS)]
    max_iterations: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let resolver = Resolver::new().with_max_iterations(cli.max_iterations);

    let resolved = match &cli.config_dir {
        Some(dir) => {
            let loader = ConfigLoader::new(dir)
                .with_env_prefix(&cli.env_prefix)
                .with_files(cli.file.clone())
                .with_resolver(resolver);
            let mut ctx = ConfigContext::new(loader);
            match ctx.get_or_load() {
                Ok(value) => value.clone(),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            if io::stdin().is_terminal() {
                eprintln!("Error: no config directory given and stdin is a terminal");
                eprintln!("Usage: config-weaver [OPTIONS] [CONFIG_DIR]");
                std::process::exit(2);
            }
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                eprintln!("Error reading from stdin: {}", e);
                std::process::exit(1);
            }
            let initial = match Value::from_yaml(&buffer) {
                Ok(value) => value,
                Err(e) => {
                    eprintln!("Error parsing stdin: {}", e);
                    std::process::exit(1);
                }
            };
            match resolver.resolve(&initial) {
                Ok(value) => value,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    match resolved.to_yaml() {
        Ok(text) => print!("{}", text),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            std::process::exit(1);
        }
    }
}
