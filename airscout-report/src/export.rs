use crate::error::ReportError;
use airscout_common::OutputFormat;
use serde::Serialize;
use std::io::Write;

/// Write `rows` as CSV (header from the field names) or as a pretty JSON array.
pub fn write_rows<T: Serialize, W: Write>(
    rows: &[T],
    format: OutputFormat,
    mut out: W,
) -> Result<(), ReportError> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush().map_err(ReportError::Output)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, rows)?;
            writeln!(out).map_err(ReportError::Output)?;
        }
    }
    Ok(())
}
