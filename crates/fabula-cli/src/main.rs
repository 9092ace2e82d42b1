//! CLI frontend for the Fabula engine: play world files in the terminal
//! and check them before shipping.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(
    name = "fabula",
    about = "Fabula — an engine for interactive fiction",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a small sample world file to play with
    Init {
        /// Where to write the world file
        #[arg(default_value = "world.json")]
        path: PathBuf,
    },

    /// Validate a world file and report diagnostics
    Check {
        /// The world file to check
        world: PathBuf,
    },

    /// Play a world file in the terminal
    Play {
        /// The world file to play
        world: PathBuf,

        /// Random seed for this session
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Init { path } => commands::init::run(&path),
        Commands::Check { world } => commands::check::run(&world),
        Commands::Play { world, seed } => commands::play::run(&world, seed),
    };

    if let Err(error) = result {
        eprintln!("{} {error}", "error:".red().bold());
        process::exit(1);
    }
}
