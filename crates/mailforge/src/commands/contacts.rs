//! `import`.

use anyhow::{Context, Result, bail};

use mailforge_core::{ColumnMapping, RecipientList, ValidationError};

use crate::cli::{ImportArgs, MappingArgs};

/// Detected mapping with command-line overrides applied.
pub fn mapping_for(list: &RecipientList, overrides: &MappingArgs) -> ColumnMapping {
    let mut mapping = list.detect_mapping();
    if let Some(column) = &overrides.email_column {
        mapping.email = Some(column.clone());
    }
    if let Some(column) = &overrides.name_column {
        mapping.name = Some(column.clone());
    }
    mapping
}

/// Prints validation errors one per line.
pub fn print_problems(errors: &[ValidationError]) {
    for error in errors {
        eprintln!("  {}: {}", error.field(), error.message());
    }
}

pub async fn import(args: ImportArgs) -> Result<()> {
    let list = RecipientList::from_path(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let mapping = mapping_for(&list, &args.mapping);

    println!("Columns: {}", list.headers().join(", "));
    println!(
        "Mapping: email = {}, name = {}",
        mapping.email.as_deref().unwrap_or("(none)"),
        mapping.name.as_deref().unwrap_or("(none)")
    );

    match list.summary(&mapping) {
        Ok(summary) => println!(
            "Rows: {} total, {} valid, {} invalid",
            summary.total, summary.valid, summary.invalid
        ),
        Err(errors) => {
            print_problems(&errors);
            bail!("Contact list cannot be used as is");
        }
    }

    let headers = list.headers();
    println!("\n{}", headers.join("\t"));
    for row in list.preview() {
        let cells: Vec<&str> = headers
            .iter()
            .map(|h| row.get(*h).map_or("", String::as_str))
            .collect();
        println!("{}", cells.join("\t"));
    }
    if list.len() > mailforge_core::recipients::PREVIEW_ROWS {
        println!("... {} more", list.len() - mailforge_core::recipients::PREVIEW_ROWS);
    }

    if let Some(path) = &args.export {
        let csv = list.to_csv()?;
        tokio::fs::write(path, csv)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Exported {} rows to {}", list.len(), path.display());
    }

    let required: Vec<&str> = args.required.iter().map(String::as_str).collect();
    if let Err(errors) = list.validate(&mapping, &required) {
        println!();
        print_problems(&errors);
        bail!("{} problem(s) found", errors.len());
    }
    Ok(())
}
