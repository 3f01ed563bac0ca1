use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[cfg(test)]
use mockall::{automock};

/// One daily observation of the series being forecast.
#[derive(Debug, PartialEq, Clone, Deserialize, Serialize)]
pub struct PricePoint {
    pub date : NaiveDate,
    pub close : f64
}

#[derive(Debug, PartialEq, Clone, Deserialize, Serialize)]
pub struct SeriesMetadata {
    pub symbol : String,
    pub from_date : NaiveDate,
    pub to_date : NaiveDate
}

/// Supplies ordered daily price observations for a symbol. The core only
/// requires strictly increasing dates; trading-calendar gaps are fine.
#[cfg_attr(test, automock)]
pub trait SeriesStore {
    fn fetch_daily_closes(&mut self, symbol : &str, from_date : &NaiveDate,
                          to_date : &NaiveDate) -> anyhow::Result<Vec<PricePoint>>;
}

/// Rejects out-of-order or duplicate dates before anything downstream
/// consumes the series.
pub fn validate_ordering(points : &[PricePoint]) -> Result<(), PipelineError> {
    if points.is_empty() {
        return Err(PipelineError::InvalidInput(String::from("series contains no observations")));
    }

    for pair in points.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(PipelineError::InvalidInput(format!(
                "series dates must be strictly increasing, got {} after {}",
                pair[1].date, pair[0].date)));
        }
    }

    Ok(())
}

pub fn closes(points : &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.close).collect()
}
