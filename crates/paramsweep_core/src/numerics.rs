//! Numerical helpers for sweep results.

use crate::config::GradPosition;
use crate::error::SweepError;
use crate::grid::SweepGrid;

/// Derivative of `values` with respect to `xs` along the leading dimension.
///
/// Interior points use second-order central differences that account for
/// non-uniform spacing; the first and last points use one-sided first-order
/// differences. Trailing dimensions are differentiated independently.
pub fn gradient(values: &SweepGrid<f64>, xs: &[f64]) -> Result<SweepGrid<f64>, SweepError> {
    let n = xs.len();
    if values.shape().first() != Some(&n) {
        return Err(SweepError::Shape(format!(
            "gradient over {n} points given values of shape {:?}",
            values.shape()
        )));
    }
    if n < 2 {
        return Err(SweepError::Shape(format!(
            "gradient needs at least two points, found {n}"
        )));
    }

    let width = values.row_len();
    let data = values.data();
    let at = |i: usize, col: usize| data[i * width + col];
    let mut out = vec![0.0; data.len()];

    for col in 0..width {
        out[col] = (at(1, col) - at(0, col)) / (xs[1] - xs[0]);
        for i in 1..n - 1 {
            let hd = xs[i] - xs[i - 1];
            let hs = xs[i + 1] - xs[i];
            let a = -hs / (hd * (hd + hs));
            let b = (hs - hd) / (hd * hs);
            let c = hd / (hs * (hd + hs));
            out[i * width + col] = a * at(i - 1, col) + b * at(i, col) + c * at(i + 1, col);
        }
        out[(n - 1) * width + col] =
            (at(n - 1, col) - at(n - 2, col)) / (xs[n - 1] - xs[n - 2]);
    }

    SweepGrid::from_data(values.shape().to_vec(), out)
        .ok_or_else(|| SweepError::Shape("gradient changed the grid size".to_string()))
}

/// X index a collapsed gradient is sampled at, `None` for [`GradPosition::All`].
///
/// Ties resolve to the lowest index.
pub fn grad_index(xs: &[f64], position: GradPosition) -> Option<usize> {
    let target = match position {
        GradPosition::All => return None,
        GradPosition::Mean => xs.iter().sum::<f64>() / xs.len() as f64,
        GradPosition::At(target) => target,
    };

    xs.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &x)| {
            let distance = (x - target).abs();
            match best {
                Some((_, closest)) if closest <= distance => best,
                _ => Some((i, distance)),
            }
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_of_line() {
        let values = SweepGrid::from_vec(vec![2.0, 4.0, 6.0]);
        let grad = gradient(&values, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(grad.data(), &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_gradient_of_parabola_non_uniform() {
        let xs = [0.0, 1.0, 3.0, 4.0];
        let values = SweepGrid::from_vec(xs.iter().map(|x| x * x).collect());
        let grad = gradient(&values, &xs).unwrap();

        // Central differences are exact for quadratics
        assert!((grad.data()[1] - 2.0).abs() < 1e-12);
        assert!((grad.data()[2] - 6.0).abs() < 1e-12);
        assert_eq!(grad.data()[0], 1.0);
        assert_eq!(grad.data()[3], 7.0);
    }

    #[test]
    fn test_gradient_per_column() {
        let values =
            SweepGrid::from_data(vec![3, 2], vec![0.0, 5.0, 1.0, 5.0, 2.0, 5.0]).unwrap();
        let grad = gradient(&values, &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(grad.shape(), &[3, 2]);
        assert_eq!(grad.data(), &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_gradient_shape_mismatch() {
        let values = SweepGrid::from_vec(vec![1.0, 2.0]);
        assert!(gradient(&values, &[0.0, 1.0, 2.0]).is_err());
        assert!(gradient(&SweepGrid::from_vec(vec![1.0]), &[0.0]).is_err());
    }

    #[test]
    fn test_grad_index() {
        let xs = [0.0, 1.0, 2.0, 3.0, 10.0];
        assert_eq!(grad_index(&xs, GradPosition::All), None);
        assert_eq!(grad_index(&xs, GradPosition::Mean), Some(3));
        assert_eq!(grad_index(&xs, GradPosition::At(1.4)), Some(1));
        assert_eq!(grad_index(&xs, GradPosition::At(1.5)), Some(1));
        assert_eq!(grad_index(&xs, GradPosition::At(-3.0)), Some(0));
    }
}
