use ndarray::{Array1, Array3};

use crate::error::PipelineError;

/// Slices a sequence into overlapping `(window, target)` pairs with a
/// stride of one. Window `i` covers `[i, i + window_length)` and its
/// target is `series[i + window_length]`, so a series of length M yields
/// exactly `M - window_length` pairs, in temporal order.
pub fn build_windows(series : &[f64], window_length : usize)
                     -> Result<(Vec<Vec<f64>>, Vec<f64>), PipelineError> {
    if window_length == 0 {
        return Err(PipelineError::InvalidInput(String::from("window length must be positive")));
    }
    if series.len() <= window_length {
        return Err(PipelineError::InvalidInput(format!(
            "series length {} is not enough history for window length {}",
            series.len(), window_length)));
    }

    let num_windows = series.len() - window_length;
    let mut features = Vec::with_capacity(num_windows);
    let mut targets = Vec::with_capacity(num_windows);
    for i in 0..num_windows {
        features.push(series[i..i + window_length].to_vec());
        targets.push(series[i + window_length]);
    }

    Ok((features, targets))
}

/// Number of leading rows that form the training split. The original
/// series is always `training_len ++ remainder`, the split index is
/// fixed before any windowing happens.
pub fn training_len(total : usize, split_ratio : f64) -> usize {
    (total as f64 * split_ratio).ceil() as usize
}

/// Splits a raw series into the training rows and the test buffer. The
/// buffer starts `window_length` rows before the split point so the
/// first held-out target still sees a full window of context, without
/// ever feeding future data into training.
pub fn split_series(series : &[f64], split_ratio : f64, window_length : usize)
                    -> Result<(&[f64], &[f64]), PipelineError> {
    let train_len = training_len(series.len(), split_ratio);
    if train_len <= window_length {
        return Err(PipelineError::InvalidInput(format!(
            "training split of {} rows cannot produce windows of length {}",
            train_len, window_length)));
    }
    if train_len >= series.len() {
        return Err(PipelineError::InvalidInput(format!(
            "split ratio {} leaves no held-out rows in a series of length {}",
            split_ratio, series.len())));
    }

    Ok((&series[..train_len], &series[train_len - window_length..]))
}

/// Packs windows into the `[samples, window_length, 1]` input the model
/// contract expects. A ragged row is a shape error, not something to
/// broadcast over.
pub fn to_model_input(windows : &[Vec<f64>]) -> Result<Array3<f64>, PipelineError> {
    let first = windows.first().ok_or_else(
        || PipelineError::InvalidInput(String::from("no windows to convert to model input")))?;
    let window_length = first.len();

    let mut input = Array3::zeros((windows.len(), window_length, 1));
    for (i, window) in windows.iter().enumerate() {
        if window.len() != window_length {
            return Err(PipelineError::ShapeMismatch {
                expected : (window_length, 1),
                actual : (window.len(), 1)
            });
        }
        for (t, &value) in window.iter().enumerate() {
            input[[i, t, 0]] = value;
        }
    }

    Ok(input)
}

pub fn to_targets(targets : &[f64]) -> Array1<f64> {
    Array1::from(targets.to_vec())
}
