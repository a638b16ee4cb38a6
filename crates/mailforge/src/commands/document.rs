//! `render`, `preview` and `validate`.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};

use mailforge_core::{RecipientList, TemplateId};
use mailforge_render::{Diagnostic, Document, RenderMode, emit, personalize, render_to_string};

use crate::App;
use crate::cli::{DocumentArgs, DocumentSource, RenderArgs};

/// Loads a document from a file or the template store and checks its root.
pub async fn load(app: &App, source: &DocumentSource, root: &str) -> Result<Document> {
    let document = fetch(app, source).await?;
    document.require_root(root)?;
    Ok(document)
}

async fn fetch(app: &App, source: &DocumentSource) -> Result<Document> {
    let document = match (&source.document, source.template) {
        (Some(path), _) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Document::from_json(&json)
                .with_context(|| format!("{} is not a valid document", path.display()))?
        }
        (None, Some(id)) => app
            .templates()
            .await?
            .get(TemplateId::new(id))
            .await?
            .with_context(|| format!("No template with id {id}"))?
            .document,
        (None, None) => bail!("Pass --document or --template"),
    };
    Ok(document)
}

/// Placeholder values from a contact list row, with canonical `email` and
/// `name` keys from the detected mapping.
async fn contact_record(path: &std::path::Path, row: usize) -> Result<BTreeMap<String, String>> {
    let list = RecipientList::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let index = row.checked_sub(1).context("Rows are numbered from 1")?;
    let mut record = list
        .row(index)
        .with_context(|| format!("{} has only {} rows", path.display(), list.len()))?;

    let mapping = list.detect_mapping();
    for (key, column) in [("email", mapping.email), ("name", mapping.name)] {
        if let Some(value) = column.and_then(|c| record.get(&c).cloned()) {
            record.insert(key.to_string(), value);
        }
    }
    Ok(record)
}

pub async fn render(app: &App, args: RenderArgs) -> Result<()> {
    let root = &args.document.root;
    let document = load(app, &args.document.source, root).await?;

    let mut record = match &args.contacts {
        Some(path) => contact_record(path, args.row).await?,
        None => BTreeMap::new(),
    };
    record.extend(args.record());

    let personal = personalize(&document, &record);
    let html = if args.fragment {
        render_to_string(&personal, root)
    } else {
        emit(&personal, root)
    };

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &html)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} bytes to {}", html.len(), path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}

pub async fn preview(app: &App, args: &DocumentArgs) -> Result<()> {
    let document = load(app, &args.source, &args.root).await?;

    match mailforge_render::render(&document, &args.root, RenderMode::Interactive) {
        Some(element) => print!("{}", element.outline()),
        None => println!("(nothing to render)"),
    }

    let placeholders = document.placeholders();
    if !placeholders.is_empty() {
        let names: Vec<&str> = placeholders.iter().map(String::as_str).collect();
        println!("\nPlaceholders: {}", names.join(", "));
    }
    Ok(())
}

pub async fn validate(app: &App, args: &DocumentArgs) -> Result<()> {
    let document = fetch(app, &args.source).await?;

    let diagnostics = document.validate(&args.root);
    if diagnostics.is_empty() {
        println!("{} blocks, no problems found", document.len());
        return Ok(());
    }

    for diagnostic in &diagnostics {
        let level = match diagnostic {
            Diagnostic::Unreachable(_) | Diagnostic::RootNotLayout { .. } => "warning",
            _ => "error",
        };
        println!("{level}: {diagnostic}");
    }
    let errors = diagnostics
        .iter()
        .filter(|d| !matches!(d, Diagnostic::Unreachable(_) | Diagnostic::RootNotLayout { .. }))
        .count();
    if errors > 0 {
        bail!("{errors} problem(s) found");
    }
    Ok(())
}
