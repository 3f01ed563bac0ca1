use ndarray::Array3;

use crate::error::PipelineError;
use crate::forecast_model::ForecastModel;
use crate::scaling::ScalingParams;

/// Produces the single next-step forecast from the most recent raw
/// closes. The tail must be exactly one window long; the same fitted
/// params used in training normalize it and denormalize the output.
pub fn forecast_next_close<M : ForecastModel + ?Sized>(
        model : &M, params : &ScalingParams,
        raw_tail : &[f64], window_length : usize) -> anyhow::Result<f64> {
    if raw_tail.len() != window_length {
        return Err(PipelineError::InvalidInput(format!(
            "forecast tail has {} values, the model window is {}",
            raw_tail.len(), window_length)).into());
    }

    let scaled = params.transform(raw_tail);
    let mut input = Array3::zeros((1, window_length, 1));
    for (t, &value) in scaled.iter().enumerate() {
        input[[0, t, 0]] = value;
    }

    let output = model.predict(&input)?;
    let scaled_next = output.first().copied().ok_or_else(
        || PipelineError::InvalidInput(String::from("model returned no prediction for the forecast window")))?;

    Ok(params.inverse_one(scaled_next))
}
