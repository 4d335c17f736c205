mod commands;
mod gpxxml;

use clap::{Parser, Subcommand};
use commands::convert::{ConvertArgs, convert_command};
use commands::info::info_command;
use commands::split::{SplitArgs, split_command};
use std::error::Error;
use std::io;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tkwrench", about = "A CLI tool for Wintec .tk1/.tk2/.tk3 tracklog files")]
struct Cli {
    #[arg(short, long, global = true, help = "Log debug output to stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Convert tracklog files into a single GPX 1.1 file")]
    Convert(ConvertArgs),
    #[command(about = "Print header and track summary of tracklog files")]
    Info {
        #[arg(required = true, value_name = "FILES")]
        files: Vec<String>,
    },
    #[command(about = "Split a .tk1 container into one .tk2 (or .tk3) file per track")]
    Split(SplitArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Convert(args) => convert_command(&args),
        Commands::Info { files } => info_command(&files),
        Commands::Split(args) => split_command(&args),
    }
}
