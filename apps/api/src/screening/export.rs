//! CSV export of a report's flattened rows.

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::screening::columns::display_scalar;

pub const CSV_FILE_NAME: &str = "resume-evaluation-report.csv";

/// Renders rows as CSV. The header comes from the first row's keys; later
/// rows are written in that column order with missing cells left empty.
pub fn rows_to_csv(rows: &[Map<String, Value>]) -> Result<String> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());
    writer.write_record(&headers).context("Failed to write CSV header")?;
    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(display_scalar).unwrap_or_default())
            .collect();
        writer.write_record(&record).context("Failed to write CSV row")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {e}"))?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}
