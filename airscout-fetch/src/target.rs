use crate::error::FetchError;
use airscout_common::BoundingBox;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Which site adapter handles a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Archive,
    Portal,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Archive => f.write_str("archive"),
            Site::Portal => f.write_str("portal"),
        }
    }
}

/// Pollutants the portal can plot as an area-averaged time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollutantKind {
    So2,
    No2,
    ParticulateMatter,
}

impl PollutantKind {
    /// Portal dataset identifier.
    pub fn dataset(self) -> &'static str {
        match self {
            PollutantKind::So2 => "OMSO2e_003_ColumnAmountSO2",
            PollutantKind::No2 => "OMNO2d_003_ColumnAmountNO2CloudScreened",
            PollutantKind::ParticulateMatter => "M2TMNXAER_5_12_4_TOTCMASS25",
        }
    }

    /// Measurement facet value, already URL-encoded.
    pub fn measurement_facet(self) -> &'static str {
        match self {
            PollutantKind::So2 => "SO2",
            PollutantKind::No2 => "NO2",
            PollutantKind::ParticulateMatter => "Particulate%20Matter",
        }
    }
}

impl fmt::Display for PollutantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollutantKind::So2 => f.write_str("SO2"),
            PollutantKind::No2 => f.write_str("NO2"),
            PollutantKind::ParticulateMatter => f.write_str("Particulate Matter"),
        }
    }
}

impl FromStr for PollutantKind {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "so2" => Ok(PollutantKind::So2),
            "no2" => Ok(PollutantKind::No2),
            "particulate matter" | "pm2.5" | "pm25" => Ok(PollutantKind::ParticulateMatter),
            _ => Err(FetchError::InvalidInput(format!(
                "unknown pollutant {s:?}; expected SO2, NO2 or Particulate Matter"
            ))),
        }
    }
}

/// Date range and pollutant shared by every portal target of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortalWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub pollutant: PollutantKind,
}

impl PortalWindow {
    pub fn new(start: NaiveDate, end: NaiveDate, pollutant: PollutantKind) -> Result<Self, FetchError> {
        let window = Self {
            start,
            end,
            pollutant,
        };
        window.validate()?;
        Ok(window)
    }

    /// Parse user input (`YYYY-MM-DD` dates and a pollutant name).
    ///
    /// ```
    /// use airscout_fetch::{PollutantKind, PortalWindow};
    ///
    /// let w = PortalWindow::parse("2019-01-01", "2020-12-31", "pm2.5").unwrap();
    /// assert_eq!(w.pollutant, PollutantKind::ParticulateMatter);
    /// assert!(PortalWindow::parse("2020-12-31", "2019-01-01", "SO2").is_err());
    /// assert!(PortalWindow::parse("2019/01/01", "2020-12-31", "SO2").is_err());
    /// ```
    pub fn parse(start: &str, end: &str, pollutant: &str) -> Result<Self, FetchError> {
        Self::new(parse_date(start)?, parse_date(end)?, pollutant.parse()?)
    }

    pub fn validate(&self) -> Result<(), FetchError> {
        if self.start > self.end {
            return Err(FetchError::InvalidInput(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn over(self, bbox: BoundingBox) -> PortalQuery {
        PortalQuery { window: self, bbox }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, FetchError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| FetchError::InvalidInput(format!("date {s:?} is not YYYY-MM-DD: {e}")))
}

/// One area-averaged time series request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortalQuery {
    pub window: PortalWindow,
    pub bbox: BoundingBox,
}

impl PortalQuery {
    /// Fragment appended to the portal base URL, including the leading `#`.
    pub fn fragment(&self) -> String {
        let w = &self.window;
        format!(
            "#&service=ArAvTs&starttime={}&endtime={}&bbox={}&data={}&variableFacets=dataFieldMeasurement%3A{}%3B",
            w.start.format(DATE_FORMAT),
            w.end.format(DATE_FORMAT),
            self.bbox,
            w.pollutant.dataset(),
            w.pollutant.measurement_facet(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "site", rename_all = "lowercase")]
pub enum TargetSource {
    Archive { city: String },
    Portal(PortalQuery),
}

/// What to fetch and where to put it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadTarget {
    pub source: TargetSource,
    pub destination: PathBuf,
    /// Final file name; the downloaded file's extension is appended when
    /// this has none.
    pub output_name: Option<String>,
}

impl DownloadTarget {
    pub fn archive(city: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: TargetSource::Archive { city: city.into() },
            destination: destination.into(),
            output_name: None,
        }
    }

    pub fn portal(query: PortalQuery, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: TargetSource::Portal(query),
            destination: destination.into(),
            output_name: None,
        }
    }

    pub fn named(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = Some(output_name.into());
        self
    }

    pub fn site(&self) -> Site {
        match self.source {
            TargetSource::Archive { .. } => Site::Archive,
            TargetSource::Portal(_) => Site::Portal,
        }
    }

    /// Human-readable identity for logs.
    pub fn label(&self) -> String {
        match &self.source {
            TargetSource::Archive { city } => format!("archive:{city}"),
            TargetSource::Portal(q) => format!(
                "portal:{}:{}..{}:{}",
                q.window.pollutant, q.window.start, q.window.end, q.bbox
            ),
        }
    }

    /// Reject anything that cannot possibly succeed, before a browser is involved.
    pub fn validate(&self) -> Result<(), FetchError> {
        match &self.source {
            TargetSource::Archive { city } if city.trim().is_empty() => {
                return Err(FetchError::InvalidInput("city name is empty".into()));
            }
            TargetSource::Archive { .. } => {}
            TargetSource::Portal(q) => q.window.validate()?,
        }
        if self.destination.as_os_str().is_empty() {
            return Err(FetchError::InvalidInput("destination directory is empty".into()));
        }
        if let Some(name) = &self.output_name {
            let trimmed = name.trim();
            if trimmed.is_empty()
                || trimmed == "."
                || trimmed == ".."
                || trimmed.contains(['/', '\\'])
            {
                return Err(FetchError::InvalidInput(format!(
                    "output name {name:?} must be a plain file name"
                )));
            }
        }
        Ok(())
    }
}

/// One portal target per registry entry, each named after its place.
pub fn portal_targets<'a, I>(entries: I, window: PortalWindow, destination: &Path) -> Vec<DownloadTarget>
where
    I: IntoIterator<Item = (&'a str, &'a BoundingBox)>,
{
    entries
        .into_iter()
        .map(|(name, bbox)| DownloadTarget::portal(window.over(*bbox), destination).named(name))
        .collect()
}
