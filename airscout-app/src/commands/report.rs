use crate::cli::ReportKind;
use airscout_common::OutputFormat;
use airscout_report::{
    box_stats, compare_monthly, load_series, monthly_average, seasonal_profile, write_rows,
};
use anyhow::{Context, Result};
use std::io::{self, Write};

pub fn run(kind: ReportKind, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    match kind {
        ReportKind::Monthly(args) => {
            let series = load_series(&args.input, args.column.as_deref())?;
            write_rows(&monthly_average(&series), format, &mut out)?;
        }
        ReportKind::Compare {
            left,
            right,
            column,
        } => {
            let a = load_series(&left, column.as_deref())?;
            let b = load_series(&right, column.as_deref())?;
            write_rows(
                &compare_monthly(&monthly_average(&a), &monthly_average(&b)),
                format,
                &mut out,
            )?;
        }
        ReportKind::Seasonal(args) => {
            let series = load_series(&args.input, args.column.as_deref())?;
            write_rows(&seasonal_profile(&series), format, &mut out)?;
        }
        ReportKind::Boxplot {
            series,
            by,
            exclude_years,
        } => {
            let data = load_series(&series.input, series.column.as_deref())?;
            write_rows(&box_stats(&data, by.into(), &exclude_years), format, &mut out)?;
        }
    }
    out.flush().context("flushing report to stdout")?;
    Ok(())
}
