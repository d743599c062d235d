//! deftrace
//!
//! Index source units into definition and reference records.
//!
//! Usage: `deftrace index --lang clojure|cpp [--config FILE] [--out FILE] <inputs...>`

use clap::{Parser, Subcommand};
use std::process;
use tracing::error;

use deftrace_tools::index::{run as run_index, IndexArgs};

#[derive(Parser, Debug)]
#[command(name = "deftrace")]
#[command(about = "Emit definition and reference records for source units")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run both indexing passes over a set of units.
    Index(IndexArgs),
}

fn main() {
    deftrace_tools::init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Index(args) => run_index(args).map(|_| ()),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}
