use crate::cohort::DesignMatrix;

/// Mean absolute relative error of the linear model `X·w` against `y`.
///
/// Rows with a zero target must be removed beforehand; a zero denominator makes
/// every evaluation infinite.
#[derive(Debug, Clone)]
pub struct Mare<'a> {
    x: &'a DesignMatrix,
    y: &'a [f64],
    inv_abs_y: Vec<f64>,
}

impl<'a> Mare<'a> {
    pub fn new(x: &'a DesignMatrix, y: &'a [f64]) -> Self {
        debug_assert_eq!(x.rows(), y.len());
        let inv_abs_y = y.iter().map(|v| 1.0 / v.abs()).collect();
        Self { x, y, inv_abs_y }
    }

    pub fn x(&self) -> &DesignMatrix {
        self.x
    }

    pub fn y(&self) -> &[f64] {
        self.y
    }

    pub fn n_rows(&self) -> usize {
        self.y.len()
    }

    pub fn n_features(&self) -> usize {
        self.x.cols()
    }

    /// `1 / |y_i|`, the per-row scale of the relative error.
    pub fn row_scale(&self, idx: usize) -> f64 {
        self.inv_abs_y[idx]
    }

    pub fn value(&self, weights: &[f64]) -> f64 {
        if self.y.is_empty() {
            return 0.0;
        }
        let mut sum = 0.0;
        for (idx, row) in self.x.iter_rows().enumerate() {
            let predicted = dot(row, weights);
            sum += (predicted - self.y[idx]).abs() * self.inv_abs_y[idx];
        }
        sum / self.y.len() as f64
    }

    pub fn residuals(&self, weights: &[f64]) -> Vec<f64> {
        self.x
            .iter_rows()
            .zip(self.y)
            .map(|(row, y)| dot(row, weights) - y)
            .collect()
    }

    /// A subgradient of `value` at `weights` (`sign(0)` taken as 0).
    pub fn subgradient(&self, weights: &[f64]) -> Vec<f64> {
        let mut grad = vec![0.0; self.n_features()];
        if self.y.is_empty() {
            return grad;
        }
        for (idx, row) in self.x.iter_rows().enumerate() {
            let r = dot(row, weights) - self.y[idx];
            if r == 0.0 {
                continue;
            }
            let s = r.signum() * self.inv_abs_y[idx];
            for (g, x) in grad.iter_mut().zip(row) {
                *g += s * x;
            }
        }
        let n = self.y.len() as f64;
        for g in &mut grad {
            *g /= n;
        }
        grad
    }

    /// `(XᵀDX, XᵀDy)` for per-row weights `D`, as a row-major `k×k` matrix and a `k` vector.
    pub fn weighted_normal_equations(&self, row_weights: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let k = self.n_features();
        let mut h = vec![0.0; k * k];
        let mut g = vec![0.0; k];
        for (idx, row) in self.x.iter_rows().enumerate() {
            let d = row_weights[idx];
            if d == 0.0 {
                continue;
            }
            for i in 0..k {
                let di = d * row[i];
                g[i] += di * self.y[idx];
                for j in i..k {
                    h[i * k + j] += di * row[j];
                }
            }
        }
        for i in 0..k {
            for j in 0..i {
                h[i * k + j] = h[j * k + i];
            }
        }
        (h, g)
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
