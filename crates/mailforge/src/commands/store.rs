//! `templates` and `campaigns`.

use anyhow::{Context, Result, bail};

use mailforge_core::{Template, TemplateId};
use mailforge_render::{BlockId, Document};

use crate::App;
use crate::cli::{CampaignsArgs, TemplatesCommand};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub async fn templates(app: &App, command: TemplatesCommand) -> Result<()> {
    let repo = app.templates().await?;

    match command {
        TemplatesCommand::List => {
            let templates = repo.list().await?;
            if templates.is_empty() {
                println!("No templates yet; `mailforge templates seed` adds a starter.");
            }
            for template in templates {
                println!(
                    "{:>4}  {:<32}  {:>3} blocks  {}",
                    template.id.map_or(0, |id| id.0),
                    template.name,
                    template.document.len(),
                    template.updated_at.format(TIME_FORMAT)
                );
            }
        }
        TemplatesCommand::Show { id } => {
            let document = repo.load_document(TemplateId::new(id)).await?;
            println!("{}", document.to_json_pretty()?);
        }
        TemplatesCommand::Save { name, file, id } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let document = Document::load(&json, BlockId::ROOT)
                .with_context(|| format!("{} is not a valid document", file.display()))?;

            let mut template = match id {
                Some(id) => {
                    let mut existing = repo
                        .get(TemplateId::new(id))
                        .await?
                        .with_context(|| format!("No template with id {id}"))?;
                    existing.name = name;
                    existing.document = document;
                    existing
                }
                None => Template::new(name, document),
            };
            repo.save(&mut template).await?;
            println!(
                "Saved template {}",
                template.id.map_or_else(String::new, |id| id.to_string())
            );
        }
        TemplatesCommand::Delete { id } => {
            if !repo.delete(TemplateId::new(id)).await? {
                bail!("No template with id {id}");
            }
            println!("Deleted template {id}");
        }
        TemplatesCommand::Seed => match repo.seed_starter().await? {
            Some(id) => println!("Added starter template {id}"),
            None => println!("Templates already exist; nothing added"),
        },
    }
    Ok(())
}

pub async fn campaigns(app: &App, args: &CampaignsArgs) -> Result<()> {
    let repo = app.campaigns().await?;
    let campaigns = repo.list(args.status).await?;
    if campaigns.is_empty() {
        println!("No campaigns");
    }

    for campaign in campaigns {
        println!(
            "{:>4}  {:<8}  {:<12}  {:<32}  {:>5} sent  {:>5} failed  {}",
            campaign.id.map_or(0, |id| id.0),
            campaign.status,
            campaign.details.campaign_type.display_name(),
            campaign.details.name,
            campaign.sent_count,
            campaign.failed_count,
            campaign
                .sent_at
                .unwrap_or(campaign.created_at)
                .format(TIME_FORMAT)
        );
    }
    Ok(())
}
