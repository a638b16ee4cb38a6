//! Command-line arguments.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use mailforge_core::{CampaignStatus, CampaignType, Security};
use mailforge_render::BlockId;

#[derive(Debug, Parser)]
#[command(name = "mailforge", version, about = "Compose, preview and send email campaigns")]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database (overrides the config file)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Emit a document as a standalone HTML email
    Render(RenderArgs),

    /// Print the preview element tree of a document
    Preview(DocumentArgs),

    /// Report structural problems in a document
    Validate(DocumentArgs),

    /// Load a contact list and show what would be sent to
    Import(ImportArgs),

    /// Send a campaign
    Send(SendArgs),

    /// Manage stored templates
    #[command(subcommand)]
    Templates(TemplatesCommand),

    /// List stored campaigns
    Campaigns(CampaignsArgs),

    /// Manage configuration and SMTP credentials
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Where a document comes from.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct DocumentSource {
    /// Document JSON file
    #[arg(long, short = 'd')]
    pub document: Option<PathBuf>,

    /// Stored template id
    #[arg(long, short = 't')]
    pub template: Option<i64>,
}

#[derive(Debug, Args)]
pub struct DocumentArgs {
    #[command(flatten)]
    pub source: DocumentSource,

    /// Root block id
    #[arg(long, default_value = BlockId::ROOT)]
    pub root: String,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    /// Placeholder value, repeatable (`name=Ada`)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_pair)]
    pub values: Vec<(String, String)>,

    /// Fill placeholders from a contact list row
    #[arg(long, value_name = "CSV")]
    pub contacts: Option<PathBuf>,

    /// 1-based row of `--contacts` to use
    #[arg(long, default_value_t = 1)]
    pub row: usize,

    /// Write the bare fragment instead of a full HTML document
    #[arg(long)]
    pub fragment: bool,

    /// Write to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

impl RenderArgs {
    /// `--set` values as a record.
    pub fn record(&self) -> BTreeMap<String, String> {
        self.values.iter().cloned().collect()
    }
}

/// Column mapping overrides.
#[derive(Debug, Args)]
pub struct MappingArgs {
    /// Column holding email addresses (auto-detected by default)
    #[arg(long)]
    pub email_column: Option<String>,

    /// Column holding recipient names (auto-detected by default)
    #[arg(long)]
    pub name_column: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// CSV file with a header row
    pub file: PathBuf,

    #[command(flatten)]
    pub mapping: MappingArgs,

    /// Column that must be present, repeatable
    #[arg(long = "require", value_name = "COLUMN")]
    pub required: Vec<String>,

    /// Write the parsed list back out as CSV
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    #[command(flatten)]
    pub source: DocumentSource,

    /// CSV contact list
    #[arg(long, short = 'r', required_unless_present = "test_to")]
    pub recipients: Option<PathBuf>,

    #[command(flatten)]
    pub mapping: MappingArgs,

    /// Internal campaign name
    #[arg(long)]
    pub name: String,

    /// Subject line; may contain placeholders
    #[arg(long)]
    pub subject: String,

    /// Sender display name (defaults to the config sender)
    #[arg(long)]
    pub from_name: Option<String>,

    /// Sender address (defaults to the config sender)
    #[arg(long)]
    pub from_email: Option<String>,

    /// Reply-To address (defaults to the config sender)
    #[arg(long)]
    pub reply_to: Option<String>,

    /// Campaign type
    #[arg(long = "type", default_value = "marketing", value_parser = parse_campaign_type)]
    pub campaign_type: CampaignType,

    /// Notes stored with the campaign
    #[arg(long, default_value = "")]
    pub description: String,

    /// Messages in flight (defaults to the config value)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Build every message but deliver nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Send a single test message to this address instead
    #[arg(long, value_name = "ADDRESS", conflicts_with = "recipients")]
    pub test_to: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum TemplatesCommand {
    /// List stored templates
    List,

    /// Print a template's document JSON
    Show {
        /// Template id
        id: i64,
    },

    /// Store a document file as a template
    Save {
        /// Template name
        name: String,

        /// Document JSON file
        file: PathBuf,

        /// Overwrite this template instead of creating one
        #[arg(long)]
        id: Option<i64>,
    },

    /// Delete a template
    Delete {
        /// Template id
        id: i64,
    },

    /// Store the starter template if there are none
    Seed,
}

#[derive(Debug, Args)]
pub struct CampaignsArgs {
    /// Only campaigns with this status
    #[arg(long, value_parser = parse_status)]
    pub status: Option<CampaignStatus>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a config file with the given settings
    Init(ConfigInitArgs),

    /// Store the SMTP password in the system keyring (read from stdin)
    SetPassword,

    /// Remove the SMTP password from the system keyring
    ForgetPassword,

    /// Connect and authenticate to the SMTP server
    Verify,
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// SMTP server hostname
    #[arg(long)]
    pub smtp_host: Option<String>,

    /// SMTP port (defaults to the port for the security mode)
    #[arg(long)]
    pub smtp_port: Option<u16>,

    /// none, tls or starttls
    #[arg(long, value_parser = parse_security)]
    pub security: Option<Security>,

    /// SMTP username
    #[arg(long)]
    pub username: Option<String>,

    /// Default sender display name
    #[arg(long)]
    pub from_name: Option<String>,

    /// Default sender address
    #[arg(long)]
    pub from_email: Option<String>,

    /// Default Reply-To address
    #[arg(long)]
    pub reply_to: Option<String>,

    /// Default send concurrency
    #[arg(long)]
    pub concurrency: Option<usize>,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {s:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_campaign_type(s: &str) -> Result<CampaignType, String> {
    s.parse()
}

fn parse_security(s: &str) -> Result<Security, String> {
    s.parse()
}

fn parse_status(s: &str) -> Result<CampaignStatus, String> {
    let status = CampaignStatus::parse(s);
    if status.as_str() == s {
        Ok(status)
    } else {
        Err(format!("unknown status: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("name=Ada"), Ok(("name".into(), "Ada".into())));
        assert_eq!(parse_pair("note=a=b"), Ok(("note".into(), "a=b".into())));
        assert!(parse_pair("name").is_err());
        assert!(parse_pair("=Ada").is_err());
    }

    #[test]
    fn test_render_args() {
        let cli = Cli::parse_from([
            "mailforge", "render", "-d", "doc.json", "--set", "name=Ada", "--set", "plan=pro",
        ]);
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.document.root, "root");
        assert_eq!(args.record()["plan"], "pro");
        assert_eq!(args.document.source.document, Some(PathBuf::from("doc.json")));
    }

    #[test]
    fn test_document_source_is_exclusive() {
        let result = Cli::try_parse_from(["mailforge", "preview", "-d", "doc.json", "-t", "3"]);
        assert!(result.is_err());
        assert!(Cli::try_parse_from(["mailforge", "preview"]).is_err());
    }

    #[test]
    fn test_send_args() {
        let cli = Cli::parse_from([
            "mailforge", "send", "-t", "1", "-r", "contacts.csv", "--name", "Launch",
            "--subject", "Hi {{name}}", "--type", "event", "--dry-run",
        ]);
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.campaign_type, CampaignType::Event);
        assert!(args.dry_run);
        assert_eq!(args.source.template, Some(1));

        let missing = Cli::try_parse_from([
            "mailforge", "send", "-t", "1", "--name", "Launch", "--subject", "Hi",
        ]);
        assert!(missing.is_err());

        let test_send = Cli::try_parse_from([
            "mailforge", "send", "-t", "1", "--name", "Launch", "--subject", "Hi",
            "--test-to", "me@acme.test",
        ]);
        assert!(test_send.is_ok());
    }

    #[test]
    fn test_status_filter() {
        assert_eq!(parse_status("sent"), Ok(CampaignStatus::Sent));
        assert!(parse_status("archived").is_err());
    }
}
