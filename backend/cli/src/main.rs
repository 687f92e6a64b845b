mod console;
mod host;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use amethyst_config::{config_dir, config_file_path, load_and_prepare};

#[derive(Parser)]
#[command(name = "amethyst")]
#[command(about = "Amethyst: a modular chat bot")]
#[command(version)]
struct Cli {
    /// Config file. Defaults to `$AMETHYST_CONFIG_DIR/config.yaml` or `~/.amethyst/config.yaml`
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot against the terminal: each line is a message
    Run,
    /// Print the effective config and validate it
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        Commands::Run => host::run(&path).await,
        Commands::CheckConfig => check_config(&path).await,
    }
}

async fn check_config(path: &std::path::Path) -> Result<()> {
    let (config, report) = load_and_prepare(path).await?;

    println!("# {}", path.display());
    print!("{}", serde_yaml::to_string(&config)?);
    println!();

    for warning in &report.warnings {
        println!("⚠️  {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("❌ {}: {}", error.path, error.message);
    }
    if !report.is_valid() {
        bail!("Config has {} error(s)", report.errors.len());
    }
    println!("✅ Config is valid.");
    Ok(())
}
