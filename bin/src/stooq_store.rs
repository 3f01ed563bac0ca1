use chrono::NaiveDate;
use forecast_lib::{PipelineError, PricePoint};

static STOOQ_HOST : &str = "stooq.com";

/// Daily close quotes from the Stooq CSV endpoint. Purely a transport:
/// ordering and sufficiency of the data are checked by the core.
pub struct StooqSeriesStore {
    client : reqwest::blocking::Client
}

impl StooqSeriesStore {
    pub fn create() -> anyhow::Result<StooqSeriesStore> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(StooqSeriesStore { client })
    }

    fn quote_url(symbol : &str, from_date : &NaiveDate, to_date : &NaiveDate) -> String {
        format!("https://{}/q/d/l/?s={}&d1={}&d2={}&i=d",
            STOOQ_HOST,
            symbol.to_lowercase(),
            from_date.format("%Y%m%d"),
            to_date.format("%Y%m%d"))
    }

    fn parse_csv(body : &str) -> anyhow::Result<Vec<PricePoint>> {
        // Header row is "Date,Open,High,Low,Close,Volume".
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(body.as_bytes());

        let mut points = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| PipelineError::UpstreamUnavailable(
                format!("malformed quote row: {}", e)))?;

            let date_field = record.get(0).ok_or_else(|| PipelineError::UpstreamUnavailable(
                format!("quote row '{}' has no date column", record.as_slice())))?;
            let close_field = record.get(4).ok_or_else(|| PipelineError::UpstreamUnavailable(
                format!("quote row '{}' has no close column", record.as_slice())))?;

            let date = NaiveDate::parse_from_str(date_field, "%Y-%m-%d")
                .map_err(|e| PipelineError::UpstreamUnavailable(format!(
                    "unparseable quote date '{}': {}", date_field, e)))?;
            let close = close_field.parse::<f64>()
                .map_err(|e| PipelineError::UpstreamUnavailable(format!(
                    "unparseable close price '{}': {}", close_field, e)))?;

            points.push(PricePoint { date, close });
        }

        Ok(points)
    }
}

impl forecast_lib::SeriesStore for StooqSeriesStore {
    fn fetch_daily_closes(&mut self, symbol : &str, from_date : &NaiveDate,
                          to_date : &NaiveDate) -> anyhow::Result<Vec<PricePoint>> {
        let url = StooqSeriesStore::quote_url(symbol, from_date, to_date);
        let response = self.client.get(&url).send()
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::UpstreamUnavailable(format!(
                "{} answered {}", STOOQ_HOST, response.status())).into());
        }

        let body = response.text()
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;
        StooqSeriesStore::parse_csv(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_url_encodes_symbol_and_date_range() {
        let from_date = NaiveDate::from_ymd(2010, 1, 1);
        let to_date = NaiveDate::from_ymd(2020, 11, 30);
        let url = StooqSeriesStore::quote_url("SPY.US", &from_date, &to_date);
        assert_eq!(url, "https://stooq.com/q/d/l/?s=spy.us&d1=20100101&d2=20201130&i=d");
    }

    #[test]
    fn csv_body_parses_into_dated_closes() -> anyhow::Result<()> {
        let body = "Date,Open,High,Low,Close,Volume\n\
                    2020-11-27,363.84,364.18,362.58,363.67,40605400\n\
                    2020-11-30,362.78,363.12,359.17,362.06,58064869\n";
        let points = StooqSeriesStore::parse_csv(body)?;

        assert_eq!(points, vec!(
            PricePoint { date : NaiveDate::from_ymd(2020, 11, 27), close : 363.67 },
            PricePoint { date : NaiveDate::from_ymd(2020, 11, 30), close : 362.06 }));
        Ok(())
    }

    #[test]
    fn quoted_fields_with_embedded_commas_do_not_shift_columns() -> anyhow::Result<()> {
        let body = "Date,Open,High,Low,Close,Volume\n\
                    2020-11-27,363.84,364.18,362.58,363.67,\"40,605,400\"\n";
        let points = StooqSeriesStore::parse_csv(body)?;

        assert_eq!(points, vec!(
            PricePoint { date : NaiveDate::from_ymd(2020, 11, 27), close : 363.67 }));
        Ok(())
    }

    #[test]
    fn blank_trailing_lines_are_ignored() -> anyhow::Result<()> {
        let body = "Date,Open,High,Low,Close,Volume\n2020-11-27,1,2,0.5,1.5,100\n\n";
        assert_eq!(StooqSeriesStore::parse_csv(body)?.len(), 1);
        Ok(())
    }

    #[test]
    fn truncated_rows_are_an_upstream_error() {
        let body = "Date,Open,High,Low,Close,Volume\n2020-11-27,363.84\n";
        let error = StooqSeriesStore::parse_csv(body).unwrap_err();
        assert!(matches!(error.downcast_ref::<PipelineError>(),
                         Some(PipelineError::UpstreamUnavailable(_))));
    }

    #[test]
    fn unparseable_prices_are_an_upstream_error() {
        let body = "Date,Open,High,Low,Close,Volume\n2020-11-27,a,b,c,not-a-price,0\n";
        assert!(StooqSeriesStore::parse_csv(body).is_err());
    }
}
