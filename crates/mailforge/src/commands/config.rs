//! `config`.

use std::io::BufRead;

use anyhow::{Context, Result, bail};

use mailforge_core::SmtpMailer;
use mailforge_core::credentials::{
    PASSWORD_ENV, delete_smtp_password, get_smtp_password, store_smtp_password,
};

use crate::App;
use crate::cli::{ConfigCommand, ConfigInitArgs};

pub async fn run(app: App, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => show(&app),
        ConfigCommand::Init(args) => init(app, args).await,
        ConfigCommand::SetPassword => set_password(&app).await,
        ConfigCommand::ForgetPassword => {
            let username = username(&app)?;
            delete_smtp_password(username)?;
            println!("Removed stored password for {username}");
            Ok(())
        }
        ConfigCommand::Verify => {
            let mailer = SmtpMailer::from_config(&app.config.smtp)?;
            mailer.verify().await.with_context(|| {
                format!("Could not log in to {}:{}", app.config.smtp.host, app.config.smtp.port)
            })?;
            println!("Connected to {} ({})", app.config.smtp.host, app.config.smtp.security.display_name());
            Ok(())
        }
    }
}

fn username(app: &App) -> Result<&str> {
    let username = app.config.smtp.username.trim();
    if username.is_empty() {
        bail!("No SMTP username configured; run `mailforge config init --username ...` first");
    }
    Ok(username)
}

fn show(app: &App) -> Result<()> {
    println!("# {}", app.config_path.display());
    println!("{}", serde_json::to_string_pretty(&app.config)?);
    println!("# database: {}", app.database.display());

    if app.config.smtp.has_username() {
        let stored = match get_smtp_password(app.config.smtp.username.trim()) {
            Ok(Some(_)) => "stored in keyring".to_string(),
            Ok(None) => format!("not stored (set {PASSWORD_ENV} or run `config set-password`)"),
            Err(e) => format!("keyring unavailable: {e}"),
        };
        println!("# password: {stored}");
    }
    Ok(())
}

async fn init(app: App, args: ConfigInitArgs) -> Result<()> {
    let mut config = app.config;
    let smtp = &mut config.smtp;

    if let Some(host) = args.smtp_host {
        smtp.host = host;
    }
    if let Some(security) = args.security {
        smtp.security = security;
        smtp.port = security.default_port();
    }
    if let Some(port) = args.smtp_port {
        smtp.port = port;
    }
    if let Some(username) = args.username {
        smtp.username = username;
    }
    if let Some(from_name) = args.from_name {
        config.sender.from_name = from_name;
    }
    if let Some(from_email) = args.from_email {
        config.sender.from_email = from_email;
    }
    if let Some(reply_to) = args.reply_to {
        config.sender.reply_to = reply_to;
    }
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 {
            bail!("Concurrency must be at least 1");
        }
        config.concurrency = concurrency;
    }

    config
        .save_to(&app.config_path)
        .await
        .with_context(|| format!("Failed to write {}", app.config_path.display()))?;
    println!("Wrote {}", app.config_path.display());
    Ok(())
}

async fn set_password(app: &App) -> Result<()> {
    let username = username(app)?.to_string();
    eprintln!("SMTP password for {username}:");

    let password = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).map(|_| line)
    })
    .await?
    .context("Failed to read password from stdin")?;
    let password = password.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("Empty password; nothing stored");
    }

    store_smtp_password(&username, password)?;
    println!("Stored password for {username}");
    Ok(())
}
