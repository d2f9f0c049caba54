mod cli;
mod completions;
mod config;
mod error;
mod logging;
mod setup;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::{FileConfig, Settings};

#[tokio::main]
async fn main() {
    // A .env file in the working directory (or a parent) feeds the `env`
    // bindings below; variables already set in the environment win.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Completions { shell } => {
            completions::generate_completions(shell);
            Ok(())
        }
        Commands::Config => {
            let settings = load_settings(&cli)?;
            print!("{}", settings.render_redacted());
            Ok(())
        }
        Commands::Check => {
            let settings = load_settings(&cli)?;
            let _guard = logging::init(&settings.logging)?;
            setup::check(&settings).await
        }
        Commands::Run => {
            let settings = load_settings(&cli)?;
            let _guard = logging::init(&settings.logging)?;
            setup::run(&settings).await
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let file = FileConfig::load(cli.config.as_deref())?;
    Ok(Settings::resolve(&cli.overrides, file)?)
}
