use crate::error::PipelineError;

/// Risk-adjusted-return ratio computed the way the legacy tooling did:
/// take the cumulative sum of the raw closes, difference it once, and
/// divide the mean of those differences by their sample standard
/// deviation times sqrt(periods_per_year).
///
/// Differencing a cumulative sum hands back the price levels themselves
/// rather than period returns, which is not how a textbook Sharpe ratio
/// is built. The behavior is kept literally for compatibility;
/// `returns_ratio` below is the conventional formulation under its own
/// name.
pub fn sharpe_like_ratio(series : &[f64], periods_per_year : u32) -> Result<f64, PipelineError> {
    let mut cumulative = Vec::with_capacity(series.len());
    let mut running = 0.0;
    for &v in series {
        running += v;
        cumulative.push(running);
    }

    let diffs : Vec<f64> = cumulative.windows(2).map(|pair| pair[1] - pair[0]).collect();
    ratio_of(&diffs, periods_per_year)
}

/// Conventional variant over simple period returns. Offered alongside
/// the legacy formula, never in place of it.
pub fn returns_ratio(series : &[f64], periods_per_year : u32) -> Result<f64, PipelineError> {
    let returns : Vec<f64> = series.windows(2).map(|pair| {
        if pair[0] == 0.0 { f64::NAN } else { pair[1] / pair[0] - 1.0 }
    }).collect();

    if returns.iter().any(|r| !r.is_finite()) {
        return Err(PipelineError::InvalidInput(String::from("cannot compute returns across a zero price")));
    }

    ratio_of(&returns, periods_per_year)
}

fn ratio_of(diffs : &[f64], periods_per_year : u32) -> Result<f64, PipelineError> {
    if diffs.len() < 2 {
        return Err(PipelineError::InvalidInput(format!(
            "{} period-over-period changes are not enough to estimate volatility", diffs.len())));
    }

    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    // Sample standard deviation, one delta degree of freedom.
    let variance = diffs.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>()
        / (diffs.len() - 1) as f64;
    let stddev = variance.sqrt();

    if stddev == 0.0 {
        return Err(PipelineError::InvalidInput(String::from(
            "zero volatility in period-over-period changes, ratio is undefined")));
    }

    Ok(mean / (stddev * (periods_per_year as f64).sqrt()))
}
