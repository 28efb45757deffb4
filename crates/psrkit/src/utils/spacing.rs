use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpacingError {
    #[error("start and stop values must be nonzero")]
    ZeroEndpoint,
    #[error("start and stop values must have the same sign")]
    MixedSigns,
    #[error("start and stop values must be finite")]
    NonFinite,
}

/// Returns `num` values between `start` and `stop` whose logarithms are
/// equally spaced.
///
/// Both endpoints must be nonzero and share a sign; negative ranges are
/// spaced by magnitude and the sign is restored afterwards. When
/// `endpoint` is false the interval is half-open and `stop` is excluded.
pub fn logspace_exp(
    start: f64,
    stop: f64,
    num: usize,
    endpoint: bool,
) -> Result<Vec<f64>, SpacingError> {
    if !start.is_finite() || !stop.is_finite() {
        return Err(SpacingError::NonFinite);
    }
    if start == 0.0 || stop == 0.0 {
        return Err(SpacingError::ZeroEndpoint);
    }
    let (sign, start, stop) = if start < 0.0 {
        (-1.0, -start, -stop)
    } else {
        (1.0, start, stop)
    };
    if stop < 0.0 {
        return Err(SpacingError::MixedSigns);
    }

    let (lo, hi) = (start.ln(), stop.ln());
    Ok(linspace(lo, hi, num, endpoint)
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            // Pin the endpoints so exp(ln(x)) rounding never leaks out.
            if i == 0 {
                sign * start
            } else if endpoint && i + 1 == num {
                sign * stop
            } else {
                sign * value.exp()
            }
        })
        .collect())
}

fn linspace(lo: f64, hi: f64, num: usize, endpoint: bool) -> Vec<f64> {
    let divisions = if endpoint { num.saturating_sub(1) } else { num };
    if divisions == 0 {
        return vec![lo; num];
    }
    let step = (hi - lo) / divisions as f64;
    (0..num).map(|i| lo + step * i as f64).collect()
}
