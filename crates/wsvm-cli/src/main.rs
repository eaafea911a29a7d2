//! wsvm CLI - run WebAssembly guest modules against the host capability table.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "wsvm")]
#[command(author, version, about = "wsvm - WebAssembly applet host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new wsvm project
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Run a guest module once
    Run {
        /// Path to the .wasm module
        module: String,

        /// Exported entry point (overrides wsvm.toml)
        #[arg(short, long)]
        entry: Option<String>,

        /// Payload returned to the guest by ws_get_data
        #[arg(short, long, conflicts_with = "data_file")]
        data: Option<String>,

        /// Read the payload from a file
        #[arg(long)]
        data_file: Option<String>,

        /// Report failures in the output instead of exiting with an error
        #[arg(long)]
        no_throw: bool,

        /// Print the run result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a module's imports and whether the host provides them
    Check {
        /// Path to the .wasm module
        module: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Run {
            module,
            entry,
            data,
            data_file,
            no_throw,
            json,
        } => commands::run::run(commands::run::RunArgs {
            module,
            entry,
            data,
            data_file,
            no_throw,
            json,
        }),
        Commands::Check { module } => commands::check::run(&module),
    }
}
