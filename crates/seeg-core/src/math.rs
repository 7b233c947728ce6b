//! Numeric helpers shared by the placement and forward-model code
//!
//! - Cumulative contact spacing over a cyclic pattern
//! - Percentiles with linear interpolation between order statistics
//! - Evenly spaced ranges (`arange`/`linspace` semantics)

use crate::error::NumericError;

/// Cumulative distances of `n` contacts from the electrode tip.
///
/// The first contact sits at 0.0; each following one adds the next distance
/// of `pattern`, cycling when the pattern is shorter than `n - 1`.
///
/// ```
/// use seeg_core::math::cumulative_spacing;
///
/// assert_eq!(cumulative_spacing(&[1.0, 2.0], 5), vec![0.0, 1.0, 3.0, 4.0, 6.0]);
/// ```
pub fn cumulative_spacing(pattern: &[f64], n: usize) -> Vec<f64> {
    std::iter::once(0.0)
        .chain(pattern.iter().cycle().scan(0.0, |total, &d| {
            *total += d;
            Some(*total)
        }))
        .take(n)
        .collect()
}

/// Percentile `q` (0–100) of `values`, interpolating linearly between the two
/// nearest order statistics.
///
/// # Errors
///
/// `EmptyInput` for an empty slice, `InvalidPercentile` outside [0, 100].
pub fn percentile(values: &[f64], q: f64) -> Result<f64, NumericError> {
    if values.is_empty() {
        return Err(NumericError::EmptyInput { what: "percentile of empty data" });
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(NumericError::InvalidPercentile { percentile: q });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Values `start, start + step, ...` strictly below `stop`.
///
/// Returns an empty vector when the range is empty or `step` is not positive.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || stop <= start {
        return Vec::new();
    }
    let count = ((stop - start) / step).ceil() as usize;
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// `num` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i == num - 1 { stop } else { start + i as f64 * step })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_spacing_cycles_pattern() {
        assert_eq!(cumulative_spacing(&[1.0, 2.0], 5), vec![0.0, 1.0, 3.0, 4.0, 6.0]);
    }

    #[test]
    fn test_cumulative_spacing_single_distance() {
        let dists = cumulative_spacing(&[3.5], 4);
        assert_eq!(dists, vec![0.0, 3.5, 7.0, 10.5]);
    }

    #[test]
    fn test_cumulative_spacing_single_contact() {
        assert_eq!(cumulative_spacing(&[2.0], 1), vec![0.0]);
        assert!(cumulative_spacing(&[2.0], 0).is_empty());
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&data, 100.0).unwrap(), 4.0);
        assert_eq!(percentile(&data, 0.0).unwrap(), 1.0);
        assert!((percentile(&data, 50.0).unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_rejects_bad_input() {
        assert!(matches!(percentile(&[], 50.0), Err(NumericError::EmptyInput { .. })));
        assert!(matches!(
            percentile(&[1.0], 120.0),
            Err(NumericError::InvalidPercentile { .. })
        ));
    }

    #[test]
    fn test_arange() {
        assert_eq!(arange(0.0, 1.0, 0.25), vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(arange(0.0, 1.1, 0.5).len(), 3);
        assert!(arange(1.0, 0.0, 0.5).is_empty());
    }

    #[test]
    fn test_linspace_endpoints() {
        let w = linspace(2.0, 6.0, 1000);
        assert_eq!(w.len(), 1000);
        assert_eq!(w[0], 2.0);
        assert_eq!(w[999], 6.0);
    }
}
