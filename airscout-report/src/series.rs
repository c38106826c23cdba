use crate::error::ReportError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::path::Path;

/// Names a leading header cell may carry.
const DATE_HEADERS: &[&str] = &["date", "time", "datetime", "timestamp"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Values this large are missing-data markers, declared or not.
const IMPLAUSIBLE_MAGNITUDE: f64 = 1e20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// One pollutant column over time, sorted by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub observations: Vec<Observation>,
}

impl Series {
    pub fn new(name: impl Into<String>, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.date);
        Self {
            name: name.into(),
            observations,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }
}

/// Load the date column and one value column from a downloaded CSV.
///
/// `column` picks the value column by header name (case-insensitive); `None`
/// takes the first column after the date.
pub fn load_series(path: &Path, column: Option<&str>) -> Result<Series, ReportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_series(&text, column, &path.display().to_string())
}

/// [`load_series`] over text already in memory. `input` names it in errors.
///
/// Metadata lines before the header row are skipped, as are rows whose date
/// or value does not parse. A `Fill Value` declared in that preamble, and any
/// value of implausible magnitude, counts as missing.
///
/// ```
/// use airscout_report::parse_series;
///
/// let text = "Title:,Area-averaged SO2\n\ntime,mean_SO2\n2020-01-01,0.25\n2020-01-02,\n";
/// let series = parse_series(text, None, "giovanni").unwrap();
/// assert_eq!(series.name, "mean_SO2");
/// assert_eq!(series.len(), 1);
/// ```
pub fn parse_series(text: &str, column: Option<&str>, input: &str) -> Result<Series, ReportError> {
    let text = text.trim_start_matches('\u{feff}');
    let header_at = find_header(text).ok_or_else(|| ReportError::MissingHeader(input.to_string()))?;
    let fills = fill_values(&text[..header_at]);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text[header_at..].as_bytes());

    let headers = reader.headers()?.clone();
    let value_idx = match column {
        Some(wanted) => headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(wanted.trim())),
        None if headers.len() > 1 => Some(1),
        None => None,
    }
    .ok_or_else(|| ReportError::MissingColumn {
        input: input.to_string(),
        column: column.unwrap_or("<value>").to_string(),
        available: headers.iter().collect::<Vec<_>>().join(", "),
    })?;
    let name = headers.get(value_idx).unwrap_or_default().to_string();

    let mut observations = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        let date = record.get(0).and_then(parse_date);
        let value = record
            .get(value_idx)
            .and_then(parse_value)
            .filter(|v| !is_fill(*v, &fills));
        match (date, value) {
            (Some(date), Some(value)) => observations.push(Observation { date, value }),
            _ => skipped += 1,
        }
    }

    if observations.is_empty() {
        return Err(ReportError::Empty(input.to_string()));
    }
    tracing::debug!(
        target: "report.series",
        input,
        column = %name,
        kept = observations.len(),
        skipped,
        fill_values = ?fills,
        "series.loaded"
    );
    Ok(Series::new(name, observations))
}

/// Byte offset of the header line.
fn find_header(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let first = line
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches('"')
            .to_ascii_lowercase();
        if DATE_HEADERS.contains(&first.as_str()) {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Markers from preamble lines such as `Fill Value (mean_SO2):,-1.2676506e+30`.
fn fill_values(preamble: &str) -> Vec<f64> {
    preamble
        .lines()
        .filter_map(|line| {
            let (label, rest) = line.split_once(',')?;
            if !label.trim().trim_matches('"').to_ascii_lowercase().starts_with("fill value") {
                return None;
            }
            parse_value(rest.split(',').next()?.trim_matches('"'))
        })
        .collect()
}

fn is_fill(value: f64, fills: &[f64]) -> bool {
    value.abs() >= IMPLAUSIBLE_MAGNITUDE
        || fills.iter().any(|f| (value - f).abs() <= f.abs() * 1e-6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_shapes() {
        let d = NaiveDate::from_ymd_opt(2021, 3, 7).unwrap();
        assert_eq!(parse_date("2021-03-07"), Some(d));
        assert_eq!(parse_date("2021/3/7"), Some(d));
        assert_eq!(parse_date(" 2021-03-07 00:00:00 "), Some(d));
        assert_eq!(parse_date("07.03.2021"), None);
    }

    #[test]
    fn values_skip_blanks_and_garbage() {
        assert_eq!(parse_value(" 42 "), Some(42.0));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("-"), None);
        assert_eq!(parse_value("NaN"), None);
    }

    #[test]
    fn archive_layout_with_named_column() {
        let text = "date, pm25, pm10, so2\n2021/3/7, 120, 80, 5\n2021/3/6, 99, , 4\n2021/3/5, , 70, \n";
        let so2 = parse_series(text, Some("SO2"), "beijing").unwrap();
        assert_eq!(so2.name, "so2");
        assert_eq!(so2.len(), 2);
        assert_eq!(so2.observations[0].date, NaiveDate::from_ymd_opt(2021, 3, 6).unwrap());

        let pm25 = parse_series(text, None, "beijing").unwrap();
        assert_eq!(pm25.name, "pm25");
        assert_eq!(pm25.len(), 2);
    }

    #[test]
    fn missing_pieces_are_reported() {
        assert!(matches!(
            parse_series("a,b\n1,2\n", None, "x"),
            Err(ReportError::MissingHeader(_))
        ));
        assert!(matches!(
            parse_series("date,pm25\n2020-01-01,1\n", Some("o3"), "x"),
            Err(ReportError::MissingColumn { .. })
        ));
        assert!(matches!(
            parse_series("date,pm25\n2020-01-01,\n", None, "x"),
            Err(ReportError::Empty(_))
        ));
    }

    #[test]
    fn declared_fill_value_is_missing_data() {
        let text = "Title:,Time Series\n\
Fill Value (mean_SO2):,-1.2676506e+30\n\
\n\
time,mean_SO2\n\
2020-01-01,0.5\n\
2020-01-02,-1.2676506e+30\n\
2020-01-03,1.5\n";
        let series = parse_series(text, None, "giovanni").unwrap();
        assert_eq!(series.len(), 2);
        let mean: f64 = series.iter().map(|o| o.value).sum::<f64>() / series.len() as f64;
        assert_eq!(mean, 1.0);
    }

    #[test]
    fn undeclared_huge_values_are_dropped() {
        let text = "date,no2\n2020-01-01,3\n2020-01-02,9.96921e36\n";
        let series = parse_series(text, None, "x").unwrap();
        assert_eq!(series.len(), 1);
        assert!(is_fill(-1.2676506e30, &[]));
        assert!(!is_fill(0.0, &fill_values("Fill Value:,-999\n")));
        assert!(is_fill(-999.0, &fill_values("Fill Value:,-999\n")));
    }
}
