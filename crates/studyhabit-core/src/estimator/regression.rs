//! Ordinary least squares, solved by normal equations.
//!
//! Small fixed feature count and at most a few hundred samples, so the
//! dense solve is plenty. A tiny ridge term keeps the system solvable
//! when features are collinear (constant columns are common with few
//! samples).

use serde::{Deserialize, Serialize};

/// Regularization added to the normal-equation diagonal.
const RIDGE: f64 = 1e-6;

/// A fitted linear model: prediction = dot(weights, x) + intercept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    /// Fit weights minimizing squared error over `(rows, targets)`.
    ///
    /// Returns `None` when there are no rows, the rows are ragged, or the
    /// solve degenerates to non-finite values.
    pub fn fit(rows: &[Vec<f64>], targets: &[f64]) -> Option<Self> {
        let n = rows.len();
        if n == 0 || n != targets.len() {
            return None;
        }
        let d = rows[0].len();
        if d == 0 || rows.iter().any(|r| r.len() != d) {
            return None;
        }

        // Augment with a bias column, then solve (X'X + rI) w = X'y.
        let cols = d + 1;
        let mut xtx = vec![vec![0.0f64; cols]; cols];
        let mut xty = vec![0.0f64; cols];

        for (row, &y) in rows.iter().zip(targets) {
            let mut aug = Vec::with_capacity(cols);
            aug.extend_from_slice(row);
            aug.push(1.0);
            for i in 0..cols {
                xty[i] += aug[i] * y;
                for j in 0..cols {
                    xtx[i][j] += aug[i] * aug[j];
                }
            }
        }
        for (i, row) in xtx.iter_mut().enumerate() {
            row[i] += RIDGE;
        }

        let solution = solve(xtx, xty)?;
        if solution.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let intercept = solution[d];
        let weights = solution[..d].to_vec();
        Some(Self { weights, intercept })
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        let dot: f64 = self.weights.iter().zip(x).map(|(w, v)| w * v).sum();
        dot + self.intercept
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for col in (row + 1)..n {
            acc -= a[row][col] * x[col];
        }
        x[row] = acc / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_linear_relation() {
        // y = 2a + 3b + 5
        let rows = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![2.0, 3.0],
        ];
        let targets: Vec<f64> = rows.iter().map(|r| 2.0 * r[0] + 3.0 * r[1] + 5.0).collect();
        let model = LinearModel::fit(&rows, &targets).unwrap();
        assert!((model.weights[0] - 2.0).abs() < 1e-3);
        assert!((model.weights[1] - 3.0).abs() < 1e-3);
        assert!((model.intercept - 5.0).abs() < 1e-3);
        assert!((model.predict(&[4.0, 4.0]) - 25.0).abs() < 1e-3);
    }

    #[test]
    fn constant_column_does_not_break_fit() {
        let rows = vec![vec![1.0, 7.0], vec![2.0, 7.0], vec![3.0, 7.0]];
        let targets = vec![10.0, 20.0, 30.0];
        let model = LinearModel::fit(&rows, &targets).unwrap();
        assert!((model.predict(&[4.0, 7.0]) - 40.0).abs() < 0.1);
    }

    #[test]
    fn rejects_empty_and_ragged_input() {
        assert!(LinearModel::fit(&[], &[]).is_none());
        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(LinearModel::fit(&ragged, &[1.0, 2.0]).is_none());
    }
}
