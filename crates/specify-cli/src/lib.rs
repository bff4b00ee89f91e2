//! Specify command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

/// Specify - turn a product prompt into documents with local or hosted LLMs
#[derive(Parser)]
#[command(name = "specify")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration directory (absolute path)
    #[arg(long, env = "SPECIFY_CONFIG_DIR", global = true)]
    pub config_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Manage stored API keys
    Config(commands::config::ConfigArgs),

    /// Generate text from a prompt
    Generate(commands::generate::GenerateArgs),

    /// Check that a provider is reachable
    Check(commands::check::CheckArgs),

    /// Show version information
    Version,
}

/// Default log filter for a `-v` count.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "specify_cli=info,specify_secrets=info,specify_providers=info,warn",
        2 => "specify_cli=debug,specify_secrets=debug,specify_providers=debug,specify_core=debug,info",
        _ => "trace",
    }
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_dir = cli.config_dir;
    match cli.command {
        Commands::Config(args) => commands::config::run(args, config_dir).await,
        Commands::Generate(args) => commands::generate::run(args, config_dir).await,
        Commands::Check(args) => commands::check::run(args, config_dir).await,
        Commands::Version => {
            println!("specify {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
