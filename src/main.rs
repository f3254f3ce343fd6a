use anyhow::Context;
use clap::Parser;
use loyalty::cli::{check, run, CheckCommand, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => run::execute(args).await.context("engine failed"),
        Commands::Check(CheckCommand::Config(arg)) => {
            check::execute_config(&arg.config).context("configuration check failed")
        }
        Commands::Check(CheckCommand::Number(arg)) => {
            check::execute_number(&arg.number).context("order number check failed")
        }
    }
}
