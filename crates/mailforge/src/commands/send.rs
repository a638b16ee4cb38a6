//! `send`.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use mailforge_core::{
    Campaign, CampaignDetails, DryRunMailer, Mailer, Recipient, RecipientList, SendReport,
    SmtpMailer, TemplateId, send_campaign, send_test,
};
use mailforge_render::{BlockId, Document, tokens};

use super::contacts::{mapping_for, print_problems};
use super::document::load;
use crate::App;
use crate::cli::SendArgs;

fn details(app: &App, args: &SendArgs) -> CampaignDetails {
    let mut details = CampaignDetails {
        name: args.name.clone(),
        subject: args.subject.clone(),
        from_name: args.from_name.clone().unwrap_or_default(),
        from_email: args.from_email.clone().unwrap_or_default(),
        reply_to: args.reply_to.clone().unwrap_or_default(),
        description: args.description.clone(),
        campaign_type: args.campaign_type,
    };
    app.config.sender.fill(&mut details);
    details
}

/// Placeholders used by the subject or body that no column provides.
fn unmapped_placeholders(
    details: &CampaignDetails,
    document: &Document,
    headers: &[&str],
) -> BTreeSet<String> {
    let mut used = document.placeholders();
    used.extend(tokens(&details.subject).into_iter().map(str::to_string));
    used.into_iter()
        .filter(|name| name != "email" && name != "name" && !headers.contains(&name.as_str()))
        .collect()
}

pub async fn send(app: &App, args: SendArgs) -> Result<()> {
    let details = details(app, &args);
    if let Err(errors) = details.validate() {
        print_problems(&errors);
        bail!("Campaign details are incomplete");
    }
    let document = load(app, &args.source, BlockId::ROOT).await?;

    if let Some(address) = &args.test_to {
        let to = Recipient::new(address.trim(), None);
        return if args.dry_run {
            test_send(&DryRunMailer, &details, &document, &to).await
        } else {
            let mailer = SmtpMailer::from_config(&app.config.smtp)?;
            test_send(&mailer, &details, &document, &to).await
        };
    }

    let path = args
        .recipients
        .as_ref()
        .context("Pass --recipients or --test-to")?;
    let list = RecipientList::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mapping = mapping_for(&list, &args.mapping);
    let summary = match list.summary(&mapping) {
        Ok(summary) => summary,
        Err(errors) => {
            print_problems(&errors);
            bail!("Contact list cannot be used as is");
        }
    };
    if summary.invalid > 0 {
        warn!("Skipping {} rows without a valid email address", summary.invalid);
    }
    let unmapped = unmapped_placeholders(&details, &document, &list.headers());
    if !unmapped.is_empty() {
        let names: Vec<&str> = unmapped.iter().map(String::as_str).collect();
        warn!("No column for placeholders: {}; they will be sent as written", names.join(", "));
    }
    let recipients = list.recipients(&mapping).map_err(mailforge_core::Error::Validation)?;
    if recipients.is_empty() {
        bail!("No recipients with a valid email address");
    }

    let concurrency = args.concurrency.unwrap_or(app.config.concurrency);
    if args.dry_run {
        let report = send_campaign(
            Arc::new(DryRunMailer),
            &details,
            &document,
            recipients,
            concurrency,
        )
        .await?;
        print_report(&report);
        return Ok(());
    }

    let mailer = Arc::new(SmtpMailer::from_config(&app.config.smtp)?);
    let campaigns = app.campaigns().await?;
    let mut campaign = Campaign::new(details);
    if let Some(id) = args.source.template {
        campaign = campaign.with_template(TemplateId::new(id));
    }
    campaigns.save(&mut campaign).await?;
    let id = campaign.id.context("Campaign was not assigned an id")?;
    campaigns.mark_sending(id).await?;

    let report = send_campaign(mailer, &campaign.details, &document, recipients, concurrency).await?;
    let stored = campaigns.record_send(id, &report).await?;
    info!(id = %id, status = %stored.status, "campaign saved");

    print_report(&report);
    if report.sent() == 0 {
        bail!("No messages were delivered");
    }
    Ok(())
}

async fn test_send<M: Mailer>(
    mailer: &M,
    details: &CampaignDetails,
    document: &Document,
    to: &Recipient,
) -> Result<()> {
    send_test(mailer, details, document, to)
        .await
        .with_context(|| format!("Test message to {} failed", to.email))?;
    println!("Test message sent to {}", to.email);
    Ok(())
}

fn print_report(report: &SendReport) {
    println!("{} sent, {} failed", report.sent(), report.failed());
    for (to, reason) in report.failures() {
        println!("  {to}: {reason}");
    }
}
