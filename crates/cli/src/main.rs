//! Zenith CLI - command-line interface for the Zenith plugin host.

mod commands;
mod discovery;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use miette::Result;

#[derive(Parser)]
#[command(name = "zenith")]
#[command(author, version, about = "A native plugin host and component system")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Component directory (auto-detected if not specified)
    #[arg(short = 'd', long, global = true)]
    dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover components and show the catalog
    Scan {
        /// Show detailed information per component
        #[arg(short = 'l', long)]
        detailed: bool,
    },

    /// Scan, load all components, report, and shut down in mirror order
    Run,

    /// Load a single plugin module and list its services
    Load {
        /// Path to the module file
        path: PathBuf,
    },

    /// Show the component dependency graph
    Graph {
        /// Output format (ascii, dot)
        #[arg(short, long, default_value = "ascii")]
        format: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // The load command works on a single file and needs no directory.
    if let Some(Commands::Load { path }) = &cli.command {
        return commands::load::execute(path);
    }

    let dir = match cli.dir {
        Some(dir) => dir,
        None => discovery::default_components_dir()?,
    };

    match cli.command {
        Some(Commands::Scan { detailed }) => commands::scan::execute(&dir, detailed),
        Some(Commands::Run) | None => commands::run::execute(&dir),
        Some(Commands::Graph { format }) => commands::graph::execute(&dir, &format),
        Some(Commands::Load { .. }) => unreachable!("Load is handled earlier"),
    }
}
