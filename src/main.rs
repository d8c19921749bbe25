use std::process::ExitCode;

use clap::{Parser, Subcommand};

use mpdat::Result;
use mpdat::dat::loader;
use mpdat::utils::print_entries;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check for errors and print the parsed statements
    Check {
        path: String,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Load the file and print the resulting symbols
    Dump { path: String },
}

fn check(path: &str, verbose: bool) -> Result<()> {
    let text = std::fs::read_to_string(path)?;
    let entries = loader::consume(loader::parse(&text)?);
    print_entries(&entries, verbose);
    Ok(())
}

fn dump(path: &str) -> Result<()> {
    let table = mpdat::load_path(path)?;
    for sym in table.symbols() {
        println!("{}", sym);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Check { path, verbose } => check(path, *verbose),
        Commands::Dump { path } => dump(path),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
