//! `presage`: runs presentiment sessions and analyzes their recordings.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use presage_core::Channel;

#[derive(Parser)]
#[command(name = "presage")]
#[command(about = "Presentiment experiment runner with physiological recording")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Pseudo,
    Hardware,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full session from a JSON config, then analyze and export it
    Run {
        #[arg(long)]
        config: PathBuf,

        /// Overrides `output_dir` from the config
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Draw bits from a random source to check it works
    Bits {
        #[arg(long, value_enum, default_value = "pseudo")]
        source: SourceArg,

        /// PsyREG driver library, required for the hardware source
        #[arg(long)]
        library: Option<PathBuf>,

        #[arg(long, default_value = "6")]
        count: usize,
    },

    /// List the random sources a session could use
    Sources {
        /// PsyREG driver library to probe for a hardware device
        #[arg(long)]
        library: Option<PathBuf>,
    },

    /// Show Neulog server status and current sensor values
    Sensor {
        #[arg(long, default_value = "22002")]
        port: u16,

        /// Repeat for several channels (skin-conductance, heart-rate)
        #[arg(long = "channel")]
        channels: Vec<Channel>,
    },

    /// Re-run the analysis of an exported session directory
    Analyze {
        #[arg(long)]
        dir: PathBuf,

        /// Shuffle count; defaults to the one recorded in the summary
        #[arg(long)]
        shuffles: Option<usize>,
    },

    /// Print the default configuration as JSON
    DefaultConfig,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => commands::run::run(&config, output),
        Commands::Bits {
            source,
            library,
            count,
        } => commands::bits::run(source, library, count),
        Commands::Sources { library } => commands::sources::run(library.as_deref()),
        Commands::Sensor { port, channels } => commands::sensor::run(port, channels),
        Commands::Analyze { dir, shuffles } => commands::analyze::run(&dir, shuffles),
        Commands::DefaultConfig => commands::default_config(),
    }
}
