use clap::{Parser, Subcommand};
use anyhow::Result;
use dotenvy::dotenv;
use std::path::PathBuf;

mod backlog;
mod config;
mod output;
mod telemetry;
mod util;
mod validate;
mod youtube;

#[derive(Parser)]
#[command(name = "archiver", about = "Moves expired public live streams to a restricted visibility")]
struct Cli {
    /// YAML configuration file
    #[arg(global = true, short, long, env = "ARCHIVER_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive eligible streams on every enabled channel
    Process(backlog::ProcessCmd),
    /// Check the configuration and list every problem
    Validate(validate::ValidateCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and ARCHIVER_LOG_FORMAT
    telemetry::config::init_tracing();

    let code = match cli.command {
        Commands::Process(args) => backlog::run(&cli.config, args).await?,
        Commands::Validate(args) => validate::run(&cli.config, args).await?,
    };
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
