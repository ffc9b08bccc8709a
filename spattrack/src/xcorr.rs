use crate::TrackError;

/// Lag-windowed correlation between two signals.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossCorrelation {
    /// Correlation value per lag.
    pub values: Vec<f64>,

    /// Lag of each value, in samples. Positive lags shift `x` forward
    /// relative to `y`.
    pub lags: Vec<isize>,
}

/// Correlates two equal-length signals over lags `-max_lag..=max_lag`.
///
/// Both signals are mean-centered before correlating, so constant
/// offsets do not contribute.
pub fn cross_correlate(
    x: &[f64],
    y: &[f64],
    max_lag: usize,
) -> Result<CrossCorrelation, TrackError> {
    if x.len() != y.len() {
        return Err(TrackError::LengthMismatch(x.len(), y.len()));
    }
    let len = x.len();
    if max_lag >= len {
        return Err(TrackError::LagTooLong {
            max_lag,
            samples: len,
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let samples = len as f64;
    let x_mean = x.iter().sum::<f64>() / samples;
    let y_mean = y.iter().sum::<f64>() / samples;

    #[allow(clippy::cast_possible_wrap)]
    let lags: Vec<isize> = (-(max_lag as isize)..=max_lag as isize).collect();
    let values = lags
        .iter()
        .map(|&lag| {
            let mut sum = 0.0;
            for n in 0..len {
                #[allow(clippy::cast_possible_wrap)]
                let shifted = n as isize + lag;
                if 0 <= shifted && shifted < len as isize {
                    #[allow(clippy::cast_sign_loss)]
                    let shifted = shifted as usize;
                    sum += (x[shifted] - x_mean) * (y[n] - y_mean);
                }
            }
            sum
        })
        .collect();

    Ok(CrossCorrelation { values, lags })
}
