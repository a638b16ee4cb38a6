//! Imported contact lists.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;
use tracing::debug;

use mailforge_render::FieldSource;

use super::mapping::ColumnMapping;
use crate::Result;
use crate::validation::{ValidationError, ValidationResult, is_valid_email};

/// Number of rows shown in an import preview.
pub const PREVIEW_ROWS: usize = 5;

/// A contact list read from CSV: a header row and data rows.
///
/// Cells are trimmed and rows with no content are dropped. Short rows read
/// as empty strings for the missing cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientList {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

/// Counts shown after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Data rows.
    pub total: usize,
    /// Rows whose mapped email is well formed.
    pub valid: usize,
    /// Rows whose mapped email is empty or malformed.
    pub invalid: usize,
}

/// One addressable recipient with its personalization record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Delivery address.
    pub email: String,
    /// Display name, when a name column is mapped and filled.
    pub name: Option<String>,
    /// Every CSV column plus the canonical `email` and `name` keys.
    pub fields: BTreeMap<String, String>,
}

impl Recipient {
    /// Creates a recipient whose record holds just `email` (and `name`).
    #[must_use]
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        let email = email.into();
        let mut fields = BTreeMap::from([("email".to_string(), email.clone())]);
        if let Some(name) = &name {
            fields.insert("name".to_string(), name.clone());
        }
        Self {
            email,
            name,
            fields,
        }
    }
}

impl FieldSource for Recipient {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl RecipientList {
    /// Reads CSV from any reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not readable as CSV.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record);
        }

        debug!(columns = headers.len(), rows = rows.len(), "contact list parsed");
        Ok(Self { headers, rows })
    }

    /// Parses CSV text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not readable as CSV.
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    /// Reads a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not CSV.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_reader(bytes.as_slice())
    }

    /// Column names in file order.
    #[must_use]
    pub fn headers(&self) -> Vec<&str> {
        self.headers.iter().collect()
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Guesses the column mapping from the headers.
    #[must_use]
    pub fn detect_mapping(&self) -> ColumnMapping {
        ColumnMapping::detect(&self.headers())
    }

    /// A row as a header to cell map.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<BTreeMap<String, String>> {
        self.rows.get(index).map(|record| self.to_map(record))
    }

    /// The first [`PREVIEW_ROWS`] rows.
    #[must_use]
    pub fn preview(&self) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .take(PREVIEW_ROWS)
            .map(|record| self.to_map(record))
            .collect()
    }

    /// Total, valid and invalid counts for the mapped email column.
    ///
    /// # Errors
    ///
    /// Returns the mapping's validation errors.
    pub fn summary(&self, mapping: &ColumnMapping) -> std::result::Result<ImportSummary, Vec<ValidationError>> {
        let email = self.email_column(mapping)?;
        let valid = self
            .rows
            .iter()
            .filter(|record| is_valid_email(record.get(email).unwrap_or_default()))
            .count();

        Ok(ImportSummary {
            total: self.rows.len(),
            valid,
            invalid: self.rows.len() - valid,
        })
    }

    /// Full check before sending: the mapping, that there are rows, that
    /// every `required` column exists, and that every row's email is valid.
    ///
    /// Row numbers in errors are 1-based data rows.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self, mapping: &ColumnMapping, required: &[&str]) -> ValidationResult {
        let mut errors = Vec::new();
        let email = match self.email_column(mapping) {
            Ok(index) => Some(index),
            Err(mut mapping_errors) => {
                errors.append(&mut mapping_errors);
                None
            }
        };

        for column in required {
            if !self.headers.iter().any(|h| h == *column) {
                errors.push(ValidationError::MissingColumn((*column).to_string()));
            }
        }
        if self.rows.is_empty() {
            errors.push(ValidationError::NoRecipients);
        }
        if let Some(email) = email {
            for (i, record) in self.rows.iter().enumerate() {
                if !is_valid_email(record.get(email).unwrap_or_default()) {
                    errors.push(ValidationError::InvalidRecipientEmail(i + 1));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Recipients for every row with a valid email, in file order.
    ///
    /// Rows with a missing or malformed address are skipped; see
    /// [`summary`](Self::summary) for how many.
    ///
    /// # Errors
    ///
    /// Returns the mapping's validation errors.
    pub fn recipients(&self, mapping: &ColumnMapping) -> std::result::Result<Vec<Recipient>, Vec<ValidationError>> {
        let email = self.email_column(mapping)?;
        let name = mapping
            .name
            .as_deref()
            .and_then(|column| self.column(column));

        let mut recipients = Vec::with_capacity(self.rows.len());
        for (i, record) in self.rows.iter().enumerate() {
            let address = record.get(email).unwrap_or_default();
            if !is_valid_email(address) {
                debug!(row = i + 1, "skipping row without a valid email");
                continue;
            }

            let display = name
                .and_then(|index| record.get(index))
                .filter(|n| !n.is_empty())
                .map(str::to_string);
            let mut fields = self.to_map(record);
            fields.insert("email".to_string(), address.to_string());
            if let Some(display) = &display {
                fields.insert("name".to_string(), display.clone());
            }

            recipients.push(Recipient {
                email: address.to_string(),
                name: display,
                fields,
            });
        }
        Ok(recipients)
    }

    /// Writes the list back out as CSV.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);
        writer.write_record(&self.headers)?;
        for record in &self.rows {
            writer.write_record(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// The list as CSV text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn email_column(&self, mapping: &ColumnMapping) -> std::result::Result<usize, Vec<ValidationError>> {
        mapping.validate(&self.headers())?;
        mapping
            .email
            .as_deref()
            .and_then(|column| self.column(column))
            .ok_or_else(|| vec![ValidationError::MissingEmailMapping])
    }

    fn to_map(&self, record: &StringRecord) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                (
                    header.to_string(),
                    record.get(i).unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}
