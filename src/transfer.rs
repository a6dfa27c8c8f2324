//! CSV export and import.

use std::io::{Read, Write};
use tracing::{info, warn};

use crate::db::{format_date, format_timestamp, Database, StoreError, StoreResult};
use crate::models::{Application, ApplicationFilter, FieldMap, COLUMNS};

const REQUIRED_COLUMNS: [&str; 2] = ["company", "role_title"];

/// Writes every application as CSV, header first, in listing order.
/// Returns the number of data rows written.
pub fn export_csv<W: Write>(db: &Database, writer: W) -> StoreResult<usize> {
    let apps = db.read(&ApplicationFilter::default())?;

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(COLUMNS)?;
    for app in &apps {
        out.write_record(record_cells(app))?;
    }
    out.flush()?;

    info!(count = apps.len(), "exported applications");
    Ok(apps.len())
}

/// Reads CSV rows and inserts them through [`Database::bulk_import`].
///
/// Header names are trimmed and lowercased. Both `company` and `role_title`
/// columns must be present or nothing is imported.
pub fn import_csv<R: Read>(db: &Database, reader: R) -> StoreResult<usize> {
    let mut input = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = input
        .headers()
        .map_err(malformed)?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == col))
        .collect();
    if !missing.is_empty() {
        warn!(?missing, "csv import rejected");
        return Err(StoreError::Import(format!(
            "CSV must include columns: {}",
            missing.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for record in input.records() {
        let record = record.map_err(malformed)?;
        let row: FieldMap = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| COLUMNS.contains(&header.as_str()))
            .map(|(header, cell)| (header.clone(), cell.to_string()))
            .collect();
        rows.push(row);
    }

    db.bulk_import(&rows)
}

fn malformed(err: csv::Error) -> StoreError {
    StoreError::Import(format!("malformed CSV: {err}"))
}

fn record_cells(app: &Application) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    vec![
        app.id.to_string(),
        app.company.clone(),
        app.role_title.clone(),
        text(&app.location),
        text(&app.job_link),
        text(&app.source),
        text(&app.status),
        app.deadline.map(format_date).unwrap_or_default(),
        app.date_applied.map(format_date).unwrap_or_default(),
        app.follow_up_date.map(format_date).unwrap_or_default(),
        text(&app.priority),
        text(&app.recruiter_name),
        text(&app.recruiter_email),
        text(&app.notes),
        app.last_updated.map(format_timestamp).unwrap_or_default(),
    ]
}
