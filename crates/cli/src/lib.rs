pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "deskbot",
    about = "Deskbot operator CLI",
    long_about = "Operate the support chatbot: interactive chat, document ingestion, \
                  sample-data seeding, and readiness checks.",
    after_help = "Examples:\n  deskbot doctor --json\n  deskbot ingest\n  deskbot chat"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive chat session against the configured pipeline")]
    Chat {
        #[arg(long, help = "Classify intents with the chat model instead of keyword matching")]
        model_classification: bool,
    },
    #[command(about = "Rebuild the vector index from the document corpus")]
    Ingest,
    #[command(about = "Apply migrations and load the sample contract dataset")]
    Seed,
    #[command(about = "Validate config, database connectivity, and corpus readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { model_classification } => commands::chat::run(model_classification),
        Command::Ingest => commands::ingest::run(),
        Command::Seed => commands::seed::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
