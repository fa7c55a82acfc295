//! Gap filling for sparse, uniformly spaced series by least-squares line fit.
//!
//! The independent variable is the 0-based index, so callers must place the
//! values on a uniform grid before imputing.

/// y = slope * x + intercept
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares over `(x, y)` points. `None` with fewer than two points.
/// A zero x-variance yields a flat line through the mean of y.
pub fn linear_regression(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (numerator, denominator) = points.iter().fold((0.0, 0.0), |(num, den), (x, y)| {
        let dx = x - mean_x;
        (num + dx * (y - mean_y), den + dx * dx)
    });

    let slope = if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    };
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Replace every `None` with the fitted value at its index; known entries are
/// kept as they are. With fewer than two known entries the input comes back
/// unchanged.
pub fn impute(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let known: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|y| (i as f64, y)))
        .collect();

    let Some(fit) = linear_regression(&known) else {
        if known.len() < series.len() {
            tracing::debug!(known = known.len(), "too few points to impute; gaps left");
        }
        return series.to_vec();
    };

    series
        .iter()
        .enumerate()
        .map(|(i, v)| Some(v.unwrap_or_else(|| fit.predict(i as f64))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn regression_exact_line() {
        let fit = linear_regression(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]).unwrap();
        assert_relative_eq!(fit.slope, 2.0);
        assert_relative_eq!(fit.intercept, 1.0);
    }

    #[test]
    fn regression_needs_two_points() {
        assert!(linear_regression(&[(0.0, 1.0)]).is_none());
        assert!(linear_regression(&[]).is_none());
    }

    #[test]
    fn regression_zero_variance_is_flat() {
        let fit = linear_regression(&[(2.0, 1.0), (2.0, 3.0)]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_relative_eq!(fit.intercept, 2.0);
    }

    #[test]
    fn impute_fills_interior_and_edges() {
        let series = [None, Some(2.0), None, Some(4.0), None];
        let filled = impute(&series);
        assert_eq!(
            filled,
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]
        );
    }

    #[test]
    fn impute_with_noise_uses_least_squares() {
        let series = [Some(1.0), Some(2.0), Some(2.0), None];
        let filled = impute(&series);
        // slope 0.5, intercept 7/6
        assert_relative_eq!(filled[3].unwrap(), 0.5 * 3.0 + 7.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn impute_with_single_point_is_unchanged() {
        let series = [None, Some(2.0), None];
        assert_eq!(impute(&series), series.to_vec());
    }

    #[test]
    fn impute_dense_series_is_unchanged() {
        let series = [Some(3.0), Some(1.0), Some(2.0)];
        assert_eq!(impute(&series), series.to_vec());
    }

    proptest! {
        #[test]
        fn impute_keeps_known_entries(values in prop::collection::vec(prop::option::of(-1e6f64..1e6), 0..40)) {
            let filled = impute(&values);
            prop_assert_eq!(filled.len(), values.len());
            for (orig, new) in values.iter().zip(&filled) {
                if orig.is_some() {
                    prop_assert_eq!(orig, new);
                }
            }
            let known = values.iter().filter(|v| v.is_some()).count();
            if known >= 2 {
                prop_assert!(filled.iter().all(Option::is_some));
            }
        }
    }
}
