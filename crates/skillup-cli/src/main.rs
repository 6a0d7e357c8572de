//! skillup CLI: take AI-generated tests from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "skillup", version, about = "Streaming AI quiz client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which test to generate.
#[derive(Args, Debug, Clone)]
pub struct TestArgs {
    /// Section id
    #[arg(long)]
    pub section: String,

    /// Test number within the section
    #[arg(long, default_value = "1")]
    pub test_number: u32,

    /// Job position (defaults to `[defaults]` in the config)
    #[arg(long)]
    pub position: Option<String>,

    /// Subposition (defaults to `[defaults]` in the config)
    #[arg(long)]
    pub subposition: Option<String>,

    /// Level (defaults to `[defaults]` in the config)
    #[arg(long)]
    pub level: Option<String>,

    /// Language of the generated questions
    #[arg(long)]
    pub language: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a timed test interactively
    Take {
        #[command(flatten)]
        test: TestArgs,

        /// Exam duration in seconds
        #[arg(long)]
        duration: Option<u32>,

        /// Do not submit the result
        #[arg(long)]
        no_submit: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Stream a test and print the normalized questions as JSON
    Stream {
        #[command(flatten)]
        test: TestArgs,

        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Normalize a saved test payload or stream transcript
    Normalize {
        /// JSON payload or `data: ` stream transcript
        #[arg(long)]
        input: PathBuf,
    },

    /// List sections of a subposition
    Sections {
        /// Subposition id (defaults to `[defaults]` in the config)
        #[arg(long)]
        subposition: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List positions and their subpositions
    Positions {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Manage the configured user's profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,

        /// Config file path
        #[arg(long, global = true)]
        config: Option<PathBuf>,
    },

    /// Create a starter skillup.toml
    Init,
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile
    Show,
    /// Create or refresh the profile on the backend
    Sync,
    /// Update profile fields
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        subposition: Option<String>,
        #[arg(long)]
        level: Option<String>,
    },
    /// Delete the profile
    Delete {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skillup=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            test,
            duration,
            no_submit,
            config,
        } => commands::take::execute(test, duration, no_submit, config).await,
        Commands::Stream {
            test,
            output,
            config,
        } => commands::stream::execute(test, output, config).await,
        Commands::Normalize { input } => commands::normalize::execute(input),
        Commands::Sections {
            subposition,
            config,
        } => commands::sections::execute(subposition, config).await,
        Commands::Positions { config } => commands::positions::execute(config).await,
        Commands::Profile { action, config } => commands::profile::execute(action, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
