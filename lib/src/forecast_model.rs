use ndarray::{Array1, Array3};

#[cfg(test)]
use mockall::{automock};

/// Trainable regressor from a window of past normalized values to the
/// next normalized value.
///
/// `features` is always `[samples, window_length, 1]` and `targets` is
/// `[samples]`, both in the scaler's [0, 1] space. `predict` must not
/// mutate the model, must reject inputs whose trailing dimensions differ
/// from what the model was trained on, and stays in normalized space;
/// denormalization is the caller's job.
#[cfg_attr(test, automock)]
pub trait ForecastModel {
    fn train(&mut self, features : &Array3<f64>, targets : &Array1<f64>,
             batch_size : usize, epochs : usize) -> anyhow::Result<()>;
    fn predict(&self, features : &Array3<f64>) -> anyhow::Result<Vec<f64>>;
}
