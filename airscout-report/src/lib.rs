//! Tables derived from downloaded pollutant time series.
//!
//! Load a series with [`load_series`], aggregate it with
//! [`monthly_average`], [`compare_monthly`], [`seasonal_profile`] or
//! [`box_stats`], then write the rows with [`write_rows`].

pub mod aggregate;
pub mod error;
pub mod export;
pub mod series;

pub use aggregate::{
    BoxStats, GroupBy, MONTH_ABBR, MonthlyComparison, MonthlyMean, SeasonalPoint, box_stats,
    compare_monthly, monthly_average, seasonal_profile,
};
pub use error::ReportError;
pub use export::write_rows;
pub use series::{Observation, Series, load_series, parse_series};
