pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "barista",
    about = "Barista operator CLI",
    long_about = "Inspect configuration, check data and endpoint readiness, and run one-off \
                  chat turns against the live pipeline.",
    after_help = "Examples:\n  barista doctor --json\n  barista config\n  barista chat \"one latte please\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, static data files, and model credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Send one user message through the live pipeline and print the reply")]
    Chat {
        #[arg(help = "The customer message to send")]
        message: String,
        #[arg(long, help = "Memory JSON from a previous turn, round-tripped to the pipeline")]
        memory: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Chat { message, memory } => commands::chat::run(&message, memory.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
