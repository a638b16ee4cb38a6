//! mailforge - compose, preview and send email campaigns.

mod cli;
mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailforge_core::{CampaignRepository, Config, TemplateRepository};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailforge=info,mailforge_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let app = App::load(&cli).await?;

    match cli.command {
        Command::Render(args) => commands::document::render(&app, args).await,
        Command::Preview(args) => commands::document::preview(&app, &args).await,
        Command::Validate(args) => commands::document::validate(&app, &args).await,
        Command::Import(args) => commands::contacts::import(args).await,
        Command::Send(args) => commands::send::send(&app, args).await,
        Command::Templates(command) => commands::store::templates(&app, command).await,
        Command::Campaigns(args) => commands::store::campaigns(&app, &args).await,
        Command::Config(command) => commands::config::run(app, command).await,
    }
}

/// Loaded configuration plus where it came from.
pub struct App {
    config: Config,
    config_path: PathBuf,
    database: PathBuf,
}

impl App {
    async fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
        let config = Config::load_from(&config_path)
            .await
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
        let database = cli
            .database
            .clone()
            .unwrap_or_else(|| config.database_path());
        debug!(config = %config_path.display(), database = %database.display(), "startup");

        Ok(Self {
            config,
            config_path,
            database,
        })
    }

    async fn database_url(&self) -> Result<String> {
        if let Some(parent) = self.database.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(self.database.to_string_lossy().into_owned())
    }

    async fn templates(&self) -> Result<TemplateRepository> {
        let path = self.database_url().await?;
        TemplateRepository::new(&path)
            .await
            .with_context(|| format!("Failed to open database {path}"))
    }

    async fn campaigns(&self) -> Result<CampaignRepository> {
        let path = self.database_url().await?;
        CampaignRepository::new(&path)
            .await
            .with_context(|| format!("Failed to open database {path}"))
    }
}
