//! One-dimensional interpolants over sorted sample points.
//!
//! Both kinds extrapolate past the first and last sample by extending the
//! edge segment (linear) or edge polynomial (cubic).

/// Interpolation scheme used when resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Interpolation {
    /// Piecewise linear
    Linear,
    /// Natural cubic spline
    #[default]
    Cubic,
}

/// Interpolating function through `(xs[i], ys[i])`.
#[derive(Debug, Clone)]
pub struct Interpolant {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the samples; empty for linear interpolation
    second: Vec<f64>,
}

impl Interpolant {
    /// # Panics
    ///
    /// Panics if the inputs are empty, differ in length or `xs` is not
    /// strictly increasing.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, kind: Interpolation) -> Self {
        assert!(!xs.is_empty(), "cannot interpolate without samples");
        assert_eq!(xs.len(), ys.len(), "sample coordinates and values differ in length");
        assert!(
            xs.windows(2).all(|w| w[0] < w[1]),
            "sample coordinates must be strictly increasing"
        );
        let second = match kind {
            Interpolation::Cubic if xs.len() > 2 => natural_spline(&xs, &ys),
            _ => Vec::new(),
        };
        Self { xs, ys, second }
    }

    /// Value at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }
        let i = self
            .xs
            .partition_point(|&v| v <= x)
            .saturating_sub(1)
            .min(n - 2);
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let h = x1 - x0;
        if self.second.is_empty() {
            return y0 + (y1 - y0) * (x - x0) / h;
        }
        let (m0, m1) = (self.second[i], self.second[i + 1]);
        let (a, b) = (x1 - x, x - x0);
        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

/// Second derivatives of the natural cubic spline through the samples.
fn natural_spline(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut second = vec![0.0; n];
    // Forward sweep of the tridiagonal system for the interior points
    let mut diag = vec![0.0; n];
    let mut rhs = vec![0.0; n];
    for i in 1..n - 1 {
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        let d = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
        let mut b = 2.0 * (h0 + h1);
        let mut r = d;
        if i > 1 {
            let w = h0 / diag[i - 1];
            b -= w * h0;
            r -= w * rhs[i - 1];
        }
        diag[i] = b;
        rhs[i] = r;
    }
    for i in (1..n - 1).rev() {
        let h1 = xs[i + 1] - xs[i];
        let upper = if i + 1 < n - 1 { h1 * second[i + 1] } else { 0.0 };
        second[i] = (rhs[i] - upper) / diag[i];
    }
    second
}
