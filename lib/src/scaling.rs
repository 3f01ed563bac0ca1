use getset::{CopyGetters};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Min-max scaling parameters, fit once on the training split and then
/// passed by value to every consumer. Keeping this a plain value object
/// (rather than a shared fitted scaler) makes it impossible to re-fit
/// accidentally on test or forecast data.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct ScalingParams {
    min : f64,
    max : f64
}

impl ScalingParams {
    pub fn fit(values : &[f64]) -> Result<ScalingParams, PipelineError> {
        if values.is_empty() {
            return Err(PipelineError::InvalidInput(String::from("cannot fit scaling parameters on an empty slice")));
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in values {
            if !v.is_finite() {
                return Err(PipelineError::InvalidInput(format!("non-finite value {} in scaling input", v)));
            }
            min = min.min(v);
            max = max.max(v);
        }

        if min == max {
            return Err(PipelineError::InvalidInput(format!(
                "degenerate scaling range, all values equal {}", min)));
        }

        Ok(ScalingParams { min, max })
    }

    pub fn transform_one(&self, value : f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    /// Exact algebraic inverse of `transform_one`. Values outside the
    /// fitted range extrapolate linearly, they are never clamped.
    pub fn inverse_one(&self, value : f64) -> f64 {
        value * (self.max - self.min) + self.min
    }

    pub fn transform(&self, values : &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform_one(v)).collect()
    }

    pub fn inverse_transform(&self, values : &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.inverse_one(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn transform_maps_fitted_range_into_unit_interval() -> Result<(), PipelineError> {
        let params = ScalingParams::fit(&[10.0, 20.0, 15.0])?;
        assert_eq!((params.min(), params.max()), (10.0, 20.0));

        assert_relative_eq!(params.transform_one(10.0), 0.0);
        assert_relative_eq!(params.transform_one(20.0), 1.0);
        assert_relative_eq!(params.transform_one(15.0), 0.5);
        Ok(())
    }

    #[test]
    fn inverse_transform_round_trips_within_tolerance() -> Result<(), PipelineError> {
        let values : Vec<f64> = (0..100).map(|i| 50.0 + 1.37 * i as f64).collect();
        let params = ScalingParams::fit(&values)?;

        for &v in &values {
            assert_relative_eq!(params.inverse_one(params.transform_one(v)), v, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn values_outside_fitted_range_extrapolate_linearly() -> Result<(), PipelineError> {
        let params = ScalingParams::fit(&[0.0, 10.0])?;

        assert_relative_eq!(params.transform_one(20.0), 2.0);
        assert_relative_eq!(params.transform_one(-10.0), -1.0);
        assert_relative_eq!(params.inverse_one(2.0), 20.0);
        Ok(())
    }

    #[test]
    fn fitting_a_constant_sequence_fails() {
        let result = ScalingParams::fit(&[100.0; 10]);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn fitting_an_empty_slice_fails() {
        assert!(matches!(ScalingParams::fit(&[]), Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn fitting_non_finite_values_fails() {
        assert!(matches!(ScalingParams::fit(&[1.0, f64::NAN]), Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn transform_and_inverse_apply_elementwise() -> Result<(), PipelineError> {
        let params = ScalingParams::fit(&[0.0, 4.0])?;

        let scaled = params.transform(&[0.0, 1.0, 2.0, 4.0]);
        assert_eq!(scaled, vec!(0.0, 0.25, 0.5, 1.0));

        let restored = params.inverse_transform(&scaled);
        assert_eq!(restored, vec!(0.0, 1.0, 2.0, 4.0));
        Ok(())
    }
}
