pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "smartcrm",
    about = "Smart CRM operator CLI",
    long_about = "Prepare the CRM database, inspect configuration and readiness, and run the RFM lead-scoring agent.",
    after_help = "Examples:\n  smartcrm migrate\n  smartcrm seed\n  smartcrm doctor --json\n  smartcrm agent"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo customers and orders, then verify them")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM credentials, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Score every customer once and act on high-priority leads")]
    Agent,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Agent => commands::agent::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
