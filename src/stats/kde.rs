//! Kernel density estimation with a fixed bandwidth.

use rayon::prelude::*;
use std::f64::consts::PI;

/// Kernel function
pub trait Kernel: Copy + Sync + Send {
    /// Apply the kernel function to the given x-value.
    fn evaluate(&self, x: f64) -> f64;
}

/// Gaussian kernel
#[derive(Clone, Copy)]
pub struct Gaussian;

impl Kernel for Gaussian {
    fn evaluate(&self, x: f64) -> f64 {
        (-0.5 * x * x).exp() / (2. * PI).sqrt()
    }
}

/// Kernel density estimator
pub struct Kde<'a, K: Kernel> {
    bandwidth: f64,
    kernel: K,
    sample: &'a [f64],
}

impl<'a, K> Kde<'a, K>
where
    K: Kernel,
{
    /// Creates a new kernel density estimator from the `sample` using a kernel of the given
    /// `bandwidth`.
    ///
    /// - Panics if `sample` is empty or `bandwidth` is not positive.
    pub fn new(sample: &'a [f64], kernel: K, bandwidth: f64) -> Kde<'a, K> {
        assert!(!sample.is_empty());
        assert!(bandwidth > 0.);

        Kde {
            bandwidth,
            kernel,
            sample,
        }
    }

    /// Returns the bandwidth used by the estimator
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Maps the KDE over `xs`
    pub fn map(&self, xs: &[f64]) -> Box<[f64]> {
        xs.par_iter()
            .map(|&x| self.estimate(x))
            .collect::<Vec<_>>()
            .into_boxed_slice()
    }

    /// Estimates the probability density of `x`
    pub fn estimate(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let n = self.sample.len() as f64;
        let sum = self
            .sample
            .iter()
            .fold(0., |acc, &x_i| acc + self.kernel.evaluate((x - x_i) / h));

        sum / (h * n)
    }
}
