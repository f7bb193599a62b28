use std::process::ExitCode;

use clap::Parser;

mod cli;
mod telemetry;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // A .env file is optional; real environment variables win.
    dotenvy::dotenv().ok();

    let args = Cli::parse();
    telemetry::init("info")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => cli::serve().await,
        Command::Ask(ask) => cli::ask(ask).await,
    }
}
