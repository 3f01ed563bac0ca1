use anyhow::anyhow;
use forecast_lib::PipelineError;
use ndarray::{s, Array, Array1, Array2, Array3, ArrayView2, Axis, Dimension, Zip};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

const INPUT_SIZE : usize = 1;
const HIDDEN_SIZE : usize = 50;
const DENSE_SIZE : usize = 25;
const OUTPUT_SIZE : usize = 1;

const ADAM_LEARNING_RATE : f64 = 1e-3;
const ADAM_BETA1 : f64 = 0.9;
const ADAM_BETA2 : f64 = 0.999;
const ADAM_EPSILON : f64 = 1e-8;

fn sigmoid(v : f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

fn sigmoid_grad(activated : &Array1<f64>) -> Array1<f64> {
    activated.mapv(|a| a * (1.0 - a))
}

fn tanh_grad(activated : &Array1<f64>) -> Array1<f64> {
    activated.mapv(|a| 1.0 - a * a)
}

fn outer(column : &Array1<f64>, row : &Array1<f64>) -> Array2<f64> {
    let column = column.view().insert_axis(Axis(1));
    let row = row.view().insert_axis(Axis(0));
    column.dot(&row)
}

/// A weight tensor together with its Adam moment estimates.
#[derive(Debug)]
struct Param<D : Dimension> {
    value : Array<f64, D>,
    first_moment : Array<f64, D>,
    second_moment : Array<f64, D>
}

impl<D : Dimension> Param<D> {
    fn new(value : Array<f64, D>) -> Param<D> {
        let first_moment = Array::zeros(value.raw_dim());
        let second_moment = Array::zeros(value.raw_dim());
        Param { value, first_moment, second_moment }
    }

    fn adam_step(&mut self, grad : &Array<f64, D>, step : i32) {
        self.first_moment = &self.first_moment * ADAM_BETA1 + grad * (1.0 - ADAM_BETA1);
        self.second_moment = &self.second_moment * ADAM_BETA2
            + &grad.mapv(|g| g * g) * (1.0 - ADAM_BETA2);

        let correction1 = 1.0 - ADAM_BETA1.powi(step);
        let correction2 = 1.0 - ADAM_BETA2.powi(step);
        Zip::from(&mut self.value)
            .and(&self.first_moment)
            .and(&self.second_moment)
            .for_each(|value, &m, &v| {
                let m_hat = m / correction1;
                let v_hat = v / correction2;
                *value -= ADAM_LEARNING_RATE * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
            });
    }
}

/// One LSTM layer with the four gate blocks stacked row-wise into a
/// single pair of weight matrices (input gate, forget gate, cell
/// candidate, output gate).
#[derive(Debug)]
struct LstmLayer {
    hidden_size : usize,
    w_input : Param<ndarray::Ix2>,  // [4H, input_size]
    w_hidden : Param<ndarray::Ix2>, // [4H, H]
    bias : Param<ndarray::Ix1>      // [4H]
}

/// Everything one forward step needs to remember for backpropagation
/// through time.
#[derive(Debug)]
struct StepCache {
    input : Array1<f64>,
    hidden_prev : Array1<f64>,
    cell_prev : Array1<f64>,
    input_gate : Array1<f64>,
    forget_gate : Array1<f64>,
    cell_candidate : Array1<f64>,
    output_gate : Array1<f64>,
    cell : Array1<f64>
}

#[derive(Debug)]
struct LstmGrads {
    w_input : Array2<f64>,
    w_hidden : Array2<f64>,
    bias : Array1<f64>
}

impl LstmLayer {
    fn new(input_size : usize, hidden_size : usize, rng : &mut StdRng) -> LstmLayer {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let distribution = Uniform::new(-limit, limit);

        // Forget-gate biases start at one so early training does not
        // wipe the cell state.
        let mut bias = Array1::zeros(4 * hidden_size);
        bias.slice_mut(s![hidden_size..2 * hidden_size]).fill(1.0);

        LstmLayer {
            hidden_size,
            w_input : Param::new(Array2::random_using((4 * hidden_size, input_size), distribution, rng)),
            w_hidden : Param::new(Array2::random_using((4 * hidden_size, hidden_size), distribution, rng)),
            bias : Param::new(bias)
        }
    }

    fn zero_grads(&self) -> LstmGrads {
        LstmGrads {
            w_input : Array2::zeros(self.w_input.value.raw_dim()),
            w_hidden : Array2::zeros(self.w_hidden.value.raw_dim()),
            bias : Array1::zeros(self.bias.value.raw_dim())
        }
    }

    fn step(&self, input : &Array1<f64>, hidden_prev : &Array1<f64>, cell_prev : &Array1<f64>)
            -> (Array1<f64>, Array1<f64>, StepCache) {
        let h = self.hidden_size;
        let preactivation = self.w_input.value.dot(input)
            + self.w_hidden.value.dot(hidden_prev)
            + &self.bias.value;

        let input_gate = preactivation.slice(s![..h]).mapv(sigmoid);
        let forget_gate = preactivation.slice(s![h..2 * h]).mapv(sigmoid);
        let cell_candidate = preactivation.slice(s![2 * h..3 * h]).mapv(f64::tanh);
        let output_gate = preactivation.slice(s![3 * h..]).mapv(sigmoid);

        let cell = &forget_gate * cell_prev + &input_gate * &cell_candidate;
        let hidden = &output_gate * &cell.mapv(f64::tanh);

        let cache = StepCache {
            input : input.clone(),
            hidden_prev : hidden_prev.clone(),
            cell_prev : cell_prev.clone(),
            input_gate, forget_gate, cell_candidate, output_gate,
            cell : cell.clone()
        };
        (hidden, cell, cache)
    }

    /// Backward through one timestep. Accumulates parameter gradients
    /// and returns the gradients flowing into the layer input, the
    /// previous hidden state, and the previous cell state.
    fn step_back(&self, cache : &StepCache, d_hidden : &Array1<f64>, d_cell_in : &Array1<f64>,
                 grads : &mut LstmGrads) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
        let h = self.hidden_size;
        let cell_tanh = cache.cell.mapv(f64::tanh);

        let d_output_gate = d_hidden * &cell_tanh;
        let d_cell = d_cell_in + &(d_hidden * &cache.output_gate * &cell_tanh.mapv(|t| 1.0 - t * t));

        let d_input_gate = &d_cell * &cache.cell_candidate;
        let d_cell_candidate = &d_cell * &cache.input_gate;
        let d_forget_gate = &d_cell * &cache.cell_prev;
        let d_cell_prev = &d_cell * &cache.forget_gate;

        let mut d_preactivation = Array1::zeros(4 * h);
        d_preactivation.slice_mut(s![..h])
            .assign(&(&d_input_gate * &sigmoid_grad(&cache.input_gate)));
        d_preactivation.slice_mut(s![h..2 * h])
            .assign(&(&d_forget_gate * &sigmoid_grad(&cache.forget_gate)));
        d_preactivation.slice_mut(s![2 * h..3 * h])
            .assign(&(&d_cell_candidate * &tanh_grad(&cache.cell_candidate)));
        d_preactivation.slice_mut(s![3 * h..])
            .assign(&(&d_output_gate * &sigmoid_grad(&cache.output_gate)));

        grads.w_input += &outer(&d_preactivation, &cache.input);
        grads.w_hidden += &outer(&d_preactivation, &cache.hidden_prev);
        grads.bias += &d_preactivation;

        let d_input = self.w_input.value.t().dot(&d_preactivation);
        let d_hidden_prev = self.w_hidden.value.t().dot(&d_preactivation);
        (d_input, d_hidden_prev, d_cell_prev)
    }

    fn apply(&mut self, grads : &LstmGrads, step : i32) {
        self.w_input.adam_step(&grads.w_input, step);
        self.w_hidden.adam_step(&grads.w_hidden, step);
        self.bias.adam_step(&grads.bias, step);
    }
}

#[derive(Debug)]
struct DenseLayer {
    weights : Param<ndarray::Ix2>, // [out, in]
    bias : Param<ndarray::Ix1>
}

#[derive(Debug)]
struct DenseGrads {
    weights : Array2<f64>,
    bias : Array1<f64>
}

impl DenseLayer {
    fn new(input_size : usize, output_size : usize, rng : &mut StdRng) -> DenseLayer {
        let limit = (1.0 / input_size as f64).sqrt();
        let distribution = Uniform::new(-limit, limit);
        DenseLayer {
            weights : Param::new(Array2::random_using((output_size, input_size), distribution, rng)),
            bias : Param::new(Array1::zeros(output_size))
        }
    }

    fn zero_grads(&self) -> DenseGrads {
        DenseGrads {
            weights : Array2::zeros(self.weights.value.raw_dim()),
            bias : Array1::zeros(self.bias.value.raw_dim())
        }
    }

    fn forward(&self, input : &Array1<f64>) -> Array1<f64> {
        self.weights.value.dot(input) + &self.bias.value
    }

    fn backward(&self, input : &Array1<f64>, d_output : &Array1<f64>,
                grads : &mut DenseGrads) -> Array1<f64> {
        grads.weights += &outer(d_output, input);
        grads.bias += d_output;
        self.weights.value.t().dot(d_output)
    }

    fn apply(&mut self, grads : &DenseGrads, step : i32) {
        self.weights.adam_step(&grads.weights, step);
        self.bias.adam_step(&grads.bias, step);
    }
}

struct ModelGrads {
    lstm1 : LstmGrads,
    lstm2 : LstmGrads,
    dense1 : DenseGrads,
    dense2 : DenseGrads
}

struct Tape {
    caches1 : Vec<StepCache>,
    caches2 : Vec<StepCache>,
    final_hidden : Array1<f64>,
    dense1_out : Array1<f64>,
    output : f64
}

/// Two stacked 50-unit LSTM layers (the first feeds its full output
/// sequence into the second, the second keeps only its final hidden
/// state) followed by 25-unit and 1-unit dense reductions, trained with
/// MSE loss under Adam. Weight initialization is deterministic for a
/// given seed.
pub struct LstmForecastModel {
    lstm1 : LstmLayer,
    lstm2 : LstmLayer,
    dense1 : DenseLayer,
    dense2 : DenseLayer,
    adam_steps : i32,
    trained_shape : Option<(usize, usize)>
}

impl LstmForecastModel {
    pub fn new(seed : u64) -> LstmForecastModel {
        let mut rng = StdRng::seed_from_u64(seed);
        LstmForecastModel {
            lstm1 : LstmLayer::new(INPUT_SIZE, HIDDEN_SIZE, &mut rng),
            lstm2 : LstmLayer::new(HIDDEN_SIZE, HIDDEN_SIZE, &mut rng),
            dense1 : DenseLayer::new(HIDDEN_SIZE, DENSE_SIZE, &mut rng),
            dense2 : DenseLayer::new(DENSE_SIZE, OUTPUT_SIZE, &mut rng),
            adam_steps : 0,
            trained_shape : None
        }
    }

    fn zero_grads(&self) -> ModelGrads {
        ModelGrads {
            lstm1 : self.lstm1.zero_grads(),
            lstm2 : self.lstm2.zero_grads(),
            dense1 : self.dense1.zero_grads(),
            dense2 : self.dense2.zero_grads()
        }
    }

    fn forward_sample(&self, sample : &ArrayView2<f64>) -> Tape {
        let seq_len = sample.shape()[0];

        let mut hidden1 = Array1::zeros(HIDDEN_SIZE);
        let mut cell1 = Array1::zeros(HIDDEN_SIZE);
        let mut hidden2 = Array1::zeros(HIDDEN_SIZE);
        let mut cell2 = Array1::zeros(HIDDEN_SIZE);
        let mut caches1 = Vec::with_capacity(seq_len);
        let mut caches2 = Vec::with_capacity(seq_len);

        for t in 0..seq_len {
            let input = sample.row(t).to_owned();
            let (next_hidden1, next_cell1, cache1) = self.lstm1.step(&input, &hidden1, &cell1);
            hidden1 = next_hidden1;
            cell1 = next_cell1;
            caches1.push(cache1);

            let (next_hidden2, next_cell2, cache2) = self.lstm2.step(&hidden1, &hidden2, &cell2);
            hidden2 = next_hidden2;
            cell2 = next_cell2;
            caches2.push(cache2);
        }

        let dense1_out = self.dense1.forward(&hidden2);
        let output = self.dense2.forward(&dense1_out)[0];

        Tape { caches1, caches2, final_hidden : hidden2, dense1_out, output }
    }

    fn backward_sample(&self, tape : &Tape, d_output : f64, grads : &mut ModelGrads) {
        let seq_len = tape.caches1.len();

        let d_out = Array1::from_elem(OUTPUT_SIZE, d_output);
        let d_dense1_out = self.dense2.backward(&tape.dense1_out, &d_out, &mut grads.dense2);
        let mut d_hidden2 = self.dense1.backward(&tape.final_hidden, &d_dense1_out, &mut grads.dense1);
        let mut d_cell2 = Array1::zeros(HIDDEN_SIZE);

        // The loss reaches the second layer only through its final
        // hidden state; earlier steps receive gradient via recurrence.
        let mut d_layer2_inputs = Vec::with_capacity(seq_len); // reverse order
        for t in (0..seq_len).rev() {
            let (d_input, d_hidden_prev, d_cell_prev) =
                self.lstm2.step_back(&tape.caches2[t], &d_hidden2, &d_cell2, &mut grads.lstm2);
            d_layer2_inputs.push(d_input);
            d_hidden2 = d_hidden_prev;
            d_cell2 = d_cell_prev;
        }

        // The first layer's hidden output at step t fed the second layer
        // at step t as well as its own next step.
        let mut d_hidden1 = Array1::zeros(HIDDEN_SIZE);
        let mut d_cell1 = Array1::zeros(HIDDEN_SIZE);
        for t in (0..seq_len).rev() {
            let d_hidden_total = &d_hidden1 + &d_layer2_inputs[seq_len - 1 - t];
            let (_d_input, d_hidden_prev, d_cell_prev) =
                self.lstm1.step_back(&tape.caches1[t], &d_hidden_total, &d_cell1, &mut grads.lstm1);
            d_hidden1 = d_hidden_prev;
            d_cell1 = d_cell_prev;
        }
    }
}

impl forecast_lib::ForecastModel for LstmForecastModel {
    fn train(&mut self, features : &Array3<f64>, targets : &Array1<f64>,
             batch_size : usize, epochs : usize) -> anyhow::Result<()> {
        let samples = features.shape()[0];
        let window_length = features.shape()[1];
        let feature_count = features.shape()[2];

        if samples == 0 || samples != targets.len() {
            return Err(PipelineError::InvalidInput(format!(
                "{} feature windows cannot be trained against {} targets",
                samples, targets.len())).into());
        }
        if feature_count != INPUT_SIZE {
            return Err(PipelineError::ShapeMismatch {
                expected : (window_length, INPUT_SIZE),
                actual : (window_length, feature_count)
            }.into());
        }
        if batch_size == 0 || epochs == 0 {
            return Err(PipelineError::InvalidInput(String::from(
                "batch size and epoch count must be positive")).into());
        }

        self.trained_shape = Some((window_length, feature_count));

        for _epoch in 0..epochs {
            let mut start = 0;
            while start < samples {
                let end = (start + batch_size).min(samples);
                let count = (end - start) as f64;

                let mut grads = self.zero_grads();
                for i in start..end {
                    let sample = features.slice(s![i, .., ..]);
                    let tape = self.forward_sample(&sample);
                    let error = tape.output - targets[i];
                    // d(mean squared error)/d(output), averaged over the batch.
                    self.backward_sample(&tape, 2.0 * error / count, &mut grads);
                }

                self.adam_steps += 1;
                self.lstm1.apply(&grads.lstm1, self.adam_steps);
                self.lstm2.apply(&grads.lstm2, self.adam_steps);
                self.dense1.apply(&grads.dense1, self.adam_steps);
                self.dense2.apply(&grads.dense2, self.adam_steps);

                start = end;
            }
        }

        Ok(())
    }

    fn predict(&self, features : &Array3<f64>) -> anyhow::Result<Vec<f64>> {
        let (window_length, feature_count) = self.trained_shape
            .ok_or_else(|| anyhow!("model has not been trained yet"))?;
        if features.shape()[1] != window_length || features.shape()[2] != feature_count {
            return Err(PipelineError::ShapeMismatch {
                expected : (window_length, feature_count),
                actual : (features.shape()[1], features.shape()[2])
            }.into());
        }

        let predictions = (0..features.shape()[0]).map(|i| {
            let sample = features.slice(s![i, .., ..]);
            self.forward_sample(&sample).output
        }).collect();
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_lib::ForecastModel;

    // Six 4-step windows over a gentle ramp, every target 0.5.
    fn toy_dataset() -> (Array3<f64>, Array1<f64>) {
        let mut features = Array3::zeros((6, 4, 1));
        for i in 0..6 {
            for t in 0..4 {
                features[[i, t, 0]] = 0.1 * (i + t) as f64;
            }
        }
        let targets = Array1::from_elem(6, 0.5);
        (features, targets)
    }

    #[test]
    fn predicting_before_training_fails() {
        let model = LstmForecastModel::new(1138);
        let input = Array3::zeros((1, 4, 1));
        assert!(model.predict(&input).is_err());
    }

    #[test]
    fn window_length_is_locked_in_by_training() -> anyhow::Result<()> {
        let mut model = LstmForecastModel::new(1138);
        let (features, targets) = toy_dataset();
        model.train(&features, &targets, 2, 1)?;

        let wrong_window = Array3::zeros((1, 5, 1));
        let error = model.predict(&wrong_window).unwrap_err();
        assert!(matches!(error.downcast_ref::<PipelineError>(),
                         Some(PipelineError::ShapeMismatch { .. })));

        assert_eq!(model.predict(&Array3::zeros((2, 4, 1)))?.len(), 2);
        Ok(())
    }

    #[test]
    fn multi_feature_input_is_a_shape_error() {
        let mut model = LstmForecastModel::new(1138);
        let features = Array3::zeros((3, 4, 2));
        let targets = Array1::zeros(3);

        let error = model.train(&features, &targets, 1, 1).unwrap_err();
        assert!(matches!(error.downcast_ref::<PipelineError>(),
                         Some(PipelineError::ShapeMismatch { .. })));
    }

    #[test]
    fn mismatched_target_count_is_invalid_input() {
        let mut model = LstmForecastModel::new(1138);
        let (features, _) = toy_dataset();
        let targets = Array1::zeros(5);

        let error = model.train(&features, &targets, 1, 1).unwrap_err();
        assert!(matches!(error.downcast_ref::<PipelineError>(),
                         Some(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut model = LstmForecastModel::new(1138);
        let (features, targets) = toy_dataset();
        assert!(model.train(&features, &targets, 0, 1).is_err());
    }

    #[test]
    fn training_is_deterministic_under_a_fixed_seed() -> anyhow::Result<()> {
        let (features, targets) = toy_dataset();

        let mut first = LstmForecastModel::new(42);
        let mut second = LstmForecastModel::new(42);
        first.train(&features, &targets, 2, 2)?;
        second.train(&features, &targets, 2, 2)?;

        assert_eq!(first.predict(&features)?, second.predict(&features)?);

        let mut other_seed = LstmForecastModel::new(43);
        other_seed.train(&features, &targets, 2, 2)?;
        assert_ne!(first.predict(&features)?, other_seed.predict(&features)?);
        Ok(())
    }

    #[test]
    fn predict_does_not_change_the_model() -> anyhow::Result<()> {
        let (features, targets) = toy_dataset();
        let mut model = LstmForecastModel::new(7);
        model.train(&features, &targets, 2, 1)?;

        let first = model.predict(&features)?;
        let second = model.predict(&features)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn more_epochs_reduce_the_training_error() -> anyhow::Result<()> {
        let (features, targets) = toy_dataset();

        let mse = |predictions : &[f64]| -> f64 {
            predictions.iter().zip(targets.iter())
                .map(|(p, t)| (p - t) * (p - t))
                .sum::<f64>() / predictions.len() as f64
        };

        let mut briefly_trained = LstmForecastModel::new(42);
        briefly_trained.train(&features, &targets, 1, 1)?;
        let early_error = mse(&briefly_trained.predict(&features)?);

        let mut fully_trained = LstmForecastModel::new(42);
        fully_trained.train(&features, &targets, 1, 40)?;
        let late_error = mse(&fully_trained.predict(&features)?);

        assert!(late_error < early_error,
                "error after 40 epochs ({}) should undercut one epoch ({})", late_error, early_error);
        Ok(())
    }
}
