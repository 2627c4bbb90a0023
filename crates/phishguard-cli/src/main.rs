mod cli;
mod commands;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;
use phishguard_auth::config::loader::load_config;

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level);

    match &cli.command {
        Commands::SecretHash(args) => commands::hash::secret_hash(args)?,
        Commands::Permissions(args) => commands::access::permissions(args)?,
        Commands::TotpCode(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::totp::code(&config, args)?;
        }
        Commands::TotpCheck(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::totp::check(&config, args)?;
        }
        Commands::TotpUri(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::totp::uri(&config, args)?;
        }
        Commands::VerifyToken(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::token::verify(&config, args).await?;
        }
        Commands::CheckConfig => {
            let config = load_config(cli.config.as_deref())?;
            commands::config::check(&config)?;
        }
    }

    Ok(())
}
