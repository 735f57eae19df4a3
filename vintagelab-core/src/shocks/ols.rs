//! Ordinary least squares with an intercept.
//!
//! Solved by modified Gram-Schmidt QR with one reorthogonalization pass.
//! A regressor whose remaining norm falls below `RANK_TOLERANCE` times its
//! original norm is treated as collinear with earlier columns: it gets a zero
//! coefficient and does not enter the projection. Residuals therefore match
//! any minimum-norm least-squares solver.

use super::ShockError;

const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub intercept: f64,
    /// One per regressor, in input order.
    pub coefficients: Vec<f64>,
    /// `y - fitted`, one per observation.
    pub residuals: Vec<f64>,
    /// Indices of regressors dropped as collinear.
    pub dropped: Vec<usize>,
}

impl OlsFit {
    pub fn fitted(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Fit `y = a + X b`. `columns` holds one vector per regressor, each as long as `y`.
pub fn fit_ols(y: &[f64], columns: &[Vec<f64>]) -> Result<OlsFit, ShockError> {
    let n = y.len();
    if n == 0 {
        return Err(ShockError::NotEnoughRows { rows: 0, required: 1 });
    }
    if let Some(bad) = columns.iter().find(|c| c.len() != n) {
        return Err(ShockError::LengthMismatch {
            column: "regressor".into(),
            expected: n,
            actual: bad.len(),
        });
    }

    // Design column 0 is the intercept.
    let k = columns.len() + 1;
    let mut design: Vec<Vec<f64>> = Vec::with_capacity(k);
    design.push(vec![1.0; n]);
    design.extend(columns.iter().cloned());

    let mut q: Vec<Vec<f64>> = Vec::with_capacity(k);
    // r[j] holds the R entries of design column j against each kept basis vector.
    let mut r: Vec<Vec<f64>> = Vec::with_capacity(k);
    let mut kept: Vec<usize> = Vec::with_capacity(k);
    let mut dropped = Vec::new();

    for (j, col) in design.iter().enumerate() {
        let original = norm(col);
        let mut v = col.clone();
        let mut coeffs = vec![0.0; q.len()];
        for _pass in 0..2 {
            for (i, qi) in q.iter().enumerate() {
                let c = dot(qi, &v);
                coeffs[i] += c;
                for (vk, qk) in v.iter_mut().zip(qi) {
                    *vk -= c * qk;
                }
            }
        }
        let remaining = norm(&v);
        if original == 0.0 || remaining <= RANK_TOLERANCE * original {
            if j > 0 {
                dropped.push(j - 1);
            }
            continue;
        }
        for vk in &mut v {
            *vk /= remaining;
        }
        coeffs.push(remaining);
        q.push(v);
        r.push(coeffs);
        kept.push(j);
    }

    // Projection of y onto the kept basis.
    let qty: Vec<f64> = q.iter().map(|qi| dot(qi, y)).collect();
    let mut residuals = y.to_vec();
    for (qi, c) in q.iter().zip(&qty) {
        for (res, qk) in residuals.iter_mut().zip(qi) {
            *res -= c * qk;
        }
    }

    // Back-substitution: R b = Q'y, R upper triangular over kept columns.
    let m = kept.len();
    let mut beta_kept = vec![0.0; m];
    for i in (0..m).rev() {
        let mut acc = qty[i];
        for (jj, b) in beta_kept.iter().enumerate().skip(i + 1) {
            acc -= r[jj][i] * b;
        }
        beta_kept[i] = acc / r[i][i];
    }

    let mut intercept = 0.0;
    let mut coefficients = vec![0.0; columns.len()];
    for (slot, &j) in kept.iter().enumerate() {
        if j == 0 {
            intercept = beta_kept[slot];
        } else {
            coefficients[j - 1] = beta_kept[slot];
        }
    }

    Ok(OlsFit {
        intercept,
        coefficients,
        residuals,
        dropped,
    })
}
