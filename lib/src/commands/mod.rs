mod fetch_series;
mod run_forecast;

pub use fetch_series::fetch_series;
pub use run_forecast::{run_forecast, RunOptions, RunOutcome};
