use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::Document;
use super::validity;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    type_label: &'static str,
    title: &'a str,
    date: Option<NaiveDate>,
    uploaded_at: String,
    reference_code: Option<&'a str>,
    authors: String,
    director: Option<&'a str>,
    validity: &'static str,
}

/// Write the given listing as CSV, one row per document, returning the row count.
pub fn write_listing_csv<W: Write>(
    documents: &[&Document],
    today: NaiveDate,
    writer: W,
) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for document in documents {
        csv_writer.serialize(ExportRow {
            id: &document.id.0,
            type_label: document.document_type().label(),
            title: &document.title,
            date: document.date,
            uploaded_at: document.uploaded_at.to_rfc3339(),
            reference_code: document.reference_code(),
            authors: document.authors.join("; "),
            director: document.director(),
            validity: validity::validity_status(document, today).label(),
        })?;
    }
    csv_writer.flush()?;
    Ok(documents.len())
}
