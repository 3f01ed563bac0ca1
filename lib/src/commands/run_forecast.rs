use getset::{Setters};

use crate::forecast_model::*;
use crate::forecasting::forecast_next_close;
use crate::metrics::rmse;
use crate::plotter::*;
use crate::risk::sharpe_like_ratio;
use crate::scaling::ScalingParams;
use crate::series::closes;
use crate::storage::*;
use crate::windowing;

#[derive(Debug, Setters)]
#[getset(set = "pub")]
pub struct RunOptions {
    pub window_length : usize,
    pub split_ratio : f64,
    pub batch_size : usize,
    pub epochs : usize,
    pub periods_per_year : u32
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions { window_length : 60, split_ratio : 0.8,
            batch_size : 1, epochs : 1, periods_per_year : 252 }
    }
}

#[derive(Debug, PartialEq)]
pub struct RunOutcome {
    pub rmse : f64,
    pub next_close : f64,
    pub risk_ratio : f64
}

/// One full forecasting run: load the cached series, train on the
/// leading split, score the held-out rows, forecast the next close from
/// the trailing window, and compute the risk ratio on the raw series.
///
/// The scaler is fit on the training rows only and its params are handed
/// to every later stage, so neither evaluation nor forecasting can leak
/// information back into the fit.
pub fn run_forecast<M : ForecastModel>(model : &mut M,
                    plotter : &mut impl Plotter,
                    storage : &mut impl Storage,
                    input_name : &str,
                    options : &RunOptions) -> anyhow::Result<RunOutcome> {
    let (points, _metadata) = storage.load_series(input_name)?;
    let raw_closes = closes(&points);

    let (train_rows, test_buffer) =
        windowing::split_series(&raw_closes, options.split_ratio, options.window_length)?;
    let params = ScalingParams::fit(train_rows)?;

    let scaled_train = params.transform(train_rows);
    let (train_windows, train_targets) =
        windowing::build_windows(&scaled_train, options.window_length)?;
    let train_input = windowing::to_model_input(&train_windows)?;
    model.train(&train_input, &windowing::to_targets(&train_targets),
                options.batch_size, options.epochs)?;

    let scaled_test = params.transform(test_buffer);
    let (test_windows, _) = windowing::build_windows(&scaled_test, options.window_length)?;
    let test_input = windowing::to_model_input(&test_windows)?;
    let scaled_predictions = model.predict(&test_input)?;
    let predictions = params.inverse_transform(&scaled_predictions);

    let actuals = &raw_closes[train_rows.len()..];
    let test_rmse = rmse(&predictions, actuals)?;

    plotter.plot_lines(&vec!((String::from("Close"), raw_closes.clone())),
                       "Close Price History", &format!("{}/close_history", input_name))?;
    plotter.plot_lines(&vec!((String::from("Train"), train_rows.to_vec()),
                             (String::from("Actual"), actuals.to_vec()),
                             (String::from("Predicted"), predictions.clone())),
                       "Held-out Closes vs Predictions", &format!("{}/predictions", input_name))?;

    let forecast_tail = &raw_closes[raw_closes.len() - options.window_length..];
    let next_close = forecast_next_close(&*model, &params, forecast_tail, options.window_length)?;

    let risk_ratio = sharpe_like_ratio(&raw_closes, options.periods_per_year)?;

    Ok(RunOutcome { rmse : test_rmse, next_close, risk_ratio })
}
