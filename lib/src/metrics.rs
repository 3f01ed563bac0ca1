use crate::error::PipelineError;

/// Root-mean-squared error between denormalized predictions and the
/// held-out closes. Lives apart from scaling/windowing so further
/// metrics can be added without touching either.
pub fn rmse(predictions : &[f64], actuals : &[f64]) -> Result<f64, PipelineError> {
    if predictions.len() != actuals.len() {
        return Err(PipelineError::InvalidInput(format!(
            "prediction count {} does not match actual count {}",
            predictions.len(), actuals.len())));
    }
    if predictions.is_empty() {
        return Err(PipelineError::InvalidInput(String::from("rmse of empty sequences is undefined")));
    }

    let sum_squared : f64 = predictions.iter()
        .zip(actuals.iter())
        .map(|(p, a)| (p - a) * (p - a))
        .sum();

    Ok((sum_squared / predictions.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rmse_of_empty_sequences_is_an_error() {
        assert!(matches!(rmse(&[], &[]), Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn rmse_of_mismatched_lengths_is_an_error() {
        assert!(matches!(rmse(&[1.0, 2.0], &[1.0]), Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn rmse_of_a_perfect_prediction_is_zero() -> Result<(), PipelineError> {
        assert_eq!(rmse(&[5.0], &[5.0])?, 0.0);
        Ok(())
    }

    #[test]
    fn rmse_of_a_single_off_by_two_prediction_is_two() -> Result<(), PipelineError> {
        assert_eq!(rmse(&[3.0], &[1.0])?, 2.0);
        Ok(())
    }

    #[test]
    fn rmse_averages_before_taking_the_root() -> Result<(), PipelineError> {
        // Errors 3 and 4, mean square 12.5.
        assert_relative_eq!(rmse(&[4.0, 0.0], &[1.0, 4.0])?, 12.5f64.sqrt());
        Ok(())
    }
}
