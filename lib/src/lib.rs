pub mod commands;
pub mod error;
pub mod forecast_model;
pub mod forecasting;
pub mod metrics;
pub mod plotter;
pub mod risk;
pub mod scaling;
pub mod series;
pub mod storage;
pub mod windowing;

pub use commands::{fetch_series, run_forecast, RunOptions, RunOutcome};
pub use error::PipelineError;
pub use forecast_model::ForecastModel;
pub use forecasting::forecast_next_close;
pub use plotter::Plotter;
pub use scaling::ScalingParams;
pub use series::{PricePoint, SeriesMetadata, SeriesStore};
pub use storage::Storage;
