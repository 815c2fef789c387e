//! CSV export of the daily exercise history.

use crate::Result;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    date: &'a str,
    seconds: u32,
    minutes: u32,
}

/// Write `date,seconds,minutes` rows, oldest day first
///
/// Returns the number of rows written (header excluded).
pub fn write_history<W: Write>(history: &BTreeMap<String, u32>, out: W) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(out);

    for (date, seconds) in history {
        writer.serialize(CsvRow {
            date,
            seconds: *seconds,
            minutes: seconds / 60,
        })?;
    }

    // An empty history still gets a header row
    if history.is_empty() {
        writer.write_record(["date", "seconds", "minutes"])?;
    }

    writer.flush()?;
    Ok(history.len())
}

/// Export the history to a CSV file, replacing any existing file
pub fn export_history_csv(history: &BTreeMap<String, u32>, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = std::fs::File::create(path)?;
    let count = write_history(history, file)?;
    tracing::info!("Exported {} days of history to {:?}", count, path);
    Ok(count)
}
