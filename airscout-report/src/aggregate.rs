use crate::series::Series;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn month_abbr(month: u32) -> &'static str {
    MONTH_ABBR
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("???")
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyMean {
    /// First day of the month.
    pub month: NaiveDate,
    pub mean: f64,
    pub count: usize,
}

/// Mean per calendar month, oldest first.
pub fn monthly_average(series: &Series) -> Vec<MonthlyMean> {
    let mut buckets: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
    for obs in series.iter() {
        let slot = buckets
            .entry((obs.date.year(), obs.date.month()))
            .or_insert((0.0, 0));
        slot.0 += obs.value;
        slot.1 += 1;
    }
    buckets
        .into_iter()
        .filter_map(|((year, month), (sum, count))| {
            NaiveDate::from_ymd_opt(year, month, 1).map(|month| MonthlyMean {
                month,
                mean: sum / count as f64,
                count,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyComparison {
    pub month: NaiveDate,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

/// Outer join of two monthly series; a month missing on one side is `None` there.
pub fn compare_monthly(left: &[MonthlyMean], right: &[MonthlyMean]) -> Vec<MonthlyComparison> {
    let mut joined: BTreeMap<NaiveDate, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for m in left {
        joined.entry(m.month).or_default().0 = Some(m.mean);
    }
    for m in right {
        joined.entry(m.month).or_default().1 = Some(m.mean);
    }
    joined
        .into_iter()
        .map(|(month, (left, right))| MonthlyComparison { month, left, right })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonalPoint {
    pub year: i32,
    pub month: u32,
    pub month_abbr: &'static str,
    pub mean: f64,
    pub count: usize,
}

/// Mean per (year, month), grouped by year then month.
pub fn seasonal_profile(series: &Series) -> Vec<SeasonalPoint> {
    monthly_average(series)
        .into_iter()
        .map(|m| SeasonalPoint {
            year: m.month.year(),
            month: m.month.month(),
            month_abbr: month_abbr(m.month.month()),
            mean: m.mean,
            count: m.count,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// The trend.
    #[default]
    Year,
    /// The seasonality.
    Month,
}

/// Five-number summary of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub group: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Box-plot statistics per year or per calendar month.
///
/// Observations from `exclude_years` are dropped first, which keeps
/// partial years from skewing the monthly groups. Quartiles interpolate
/// linearly between order statistics.
///
/// ```
/// use airscout_report::{box_stats, GroupBy, Observation, Series};
/// use chrono::NaiveDate;
///
/// let obs = (1..=5)
///     .map(|d| Observation { date: NaiveDate::from_ymd_opt(2020, 1, d).unwrap(), value: d as f64 })
///     .collect();
/// let stats = box_stats(&Series::new("pm25", obs), GroupBy::Month, &[]);
/// assert_eq!(stats[0].group, "Jan");
/// assert_eq!((stats[0].q1, stats[0].median, stats[0].q3), (2.0, 3.0, 4.0));
/// ```
pub fn box_stats(series: &Series, by: GroupBy, exclude_years: &[i32]) -> Vec<BoxStats> {
    let mut groups: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for obs in series.iter() {
        if exclude_years.contains(&obs.date.year()) {
            continue;
        }
        let key = match by {
            GroupBy::Year => obs.date.year(),
            GroupBy::Month => obs.date.month() as i32,
        };
        groups.entry(key).or_default().push(obs.value);
    }

    groups
        .into_iter()
        .filter_map(|(key, mut values)| {
            values.sort_by(f64::total_cmp);
            let group = match by {
                GroupBy::Year => key.to_string(),
                GroupBy::Month => month_abbr(key as u32).to_string(),
            };
            Some(BoxStats {
                group,
                count: values.len(),
                min: *values.first()?,
                q1: quantile(&values, 0.25)?,
                median: quantile(&values, 0.5)?,
                q3: quantile(&values, 0.75)?,
                max: *values.last()?,
            })
        })
        .collect()
}

fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let (a, b) = (*sorted.get(lo)?, *sorted.get(hi)?);
    Some(a + (b - a) * (pos - lo as f64))
}
