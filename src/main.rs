//! psylab CLI: inspect experiment types and run simulated sessions.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod sink;
mod subject;

#[derive(Parser)]
#[command(name = "psylab", version, about = "Psychometric experiment engines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered experiment types
    List,

    /// Print the default configuration of an experiment type
    Defaults {
        /// Experiment type (digit_span, sart, stroop)
        kind: String,
    },

    /// Print the configuration schema of an experiment type
    Schema {
        /// Experiment type (digit_span, sart, stroop)
        kind: String,
    },

    /// Run a simulated subject through a full session, printing JSON lines
    Simulate {
        /// Experiment type (digit_span, sart, stroop)
        kind: String,

        /// JSON file with experiment options
        #[arg(long)]
        config: Option<PathBuf>,

        /// Inline JSON options, merged over --config
        #[arg(long)]
        options: Option<String>,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Probability that the simulated subject answers correctly
        #[arg(long, default_value = "0.85")]
        accuracy: f64,

        /// Mean simulated reaction time in milliseconds
        #[arg(long, default_value = "450")]
        mean_rt: f64,

        /// Subject identifier recorded with the session
        #[arg(long)]
        subject: Option<String>,

        /// Run the practice block before the test phase
        #[arg(long)]
        practice: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("psylab=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List => commands::list::execute(),
        Commands::Defaults { kind } => commands::defaults::execute(&kind),
        Commands::Schema { kind } => commands::schema::execute(&kind),
        Commands::Simulate {
            kind,
            config,
            options,
            seed,
            accuracy,
            mean_rt,
            subject,
            practice,
        } => commands::simulate::execute(commands::simulate::SimulateArgs {
            kind,
            config,
            options,
            seed,
            accuracy,
            mean_rt,
            subject,
            practice,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
