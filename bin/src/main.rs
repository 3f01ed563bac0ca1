mod file_storage;
mod lstm_model;
mod plotters_plotter;
mod stooq_store;

use chrono::NaiveDate;
use structopt::StructOpt;

use file_storage::FileStorage;
use lstm_model::LstmForecastModel;
use plotters_plotter::PlottersPlotter;
use stooq_store::StooqSeriesStore;

#[derive(Debug, StructOpt)]
#[structopt(name = "forecast-bot", about = "Next-day close-price forecasting")]
enum Command {
    /// Fetch a daily close history and cache it locally
    Fetch {
        /// Quote symbol, e.g. SPY.US
        symbol : String,
        #[structopt(long)]
        from_date : NaiveDate,
        #[structopt(long)]
        to_date : NaiveDate,
        #[structopt(long, default_value = "data")]
        data_dir : String
    },
    /// Train on a cached series, report held-out RMSE, the next-day
    /// forecast and the risk-adjusted-return ratio
    Run {
        /// Entry name produced by `fetch`
        input : String,
        #[structopt(long, default_value = "60")]
        window_length : usize,
        #[structopt(long, default_value = "0.8")]
        split_ratio : f64,
        #[structopt(long, default_value = "1")]
        batch_size : usize,
        #[structopt(long, default_value = "1")]
        epochs : usize,
        #[structopt(long, default_value = "252")]
        periods_per_year : u32,
        #[structopt(long, default_value = "1138")]
        seed : u64,
        #[structopt(long, default_value = "data")]
        data_dir : String
    }
}

fn main() -> anyhow::Result<()> {
    match Command::from_args() {
        Command::Fetch { symbol, from_date, to_date, data_dir } => {
            let mut store = StooqSeriesStore::create()?;
            let mut storage = FileStorage::create(&data_dir)?;

            let entry_name = forecast_lib::fetch_series(
                &mut store, &mut storage, &symbol, &from_date, &to_date)?;
            println!("Saved history for {} as {}", symbol, entry_name);
        },
        Command::Run { input, window_length, split_ratio, batch_size,
                       epochs, periods_per_year, seed, data_dir } => {
            let mut storage = FileStorage::create(&data_dir)?;
            let mut plotter = PlottersPlotter::create()?;
            let mut model = LstmForecastModel::new(seed);

            let mut options = forecast_lib::RunOptions::default();
            options.set_window_length(window_length)
                .set_split_ratio(split_ratio)
                .set_batch_size(batch_size)
                .set_epochs(epochs)
                .set_periods_per_year(periods_per_year);

            let outcome = forecast_lib::run_forecast(
                &mut model, &mut plotter, &mut storage, &input, &options)?;
            println!("Held-out RMSE: {:.4}", outcome.rmse);
            println!("Next close forecast: {:.4}", outcome.next_close);
            println!("Risk-adjusted-return ratio: {:.6}", outcome.risk_ratio);
        }
    }

    Ok(())
}
