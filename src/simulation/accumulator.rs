use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{is_nodata, Grid};

/// How no-data cells of a realization enter the cell statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataPolicy {
    /// Sentinel (and NaN) cells are skipped for that cell.
    #[default]
    Exclude,
    /// Sentinels are averaged like any other number.
    PassThrough,
}

impl NoDataPolicy {
    #[inline(always)]
    fn skips(&self, value: f64, nodata: f64) -> bool {
        *self == NoDataPolicy::Exclude && is_nodata(value, nodata)
    }
}

/// Streaming per-cell mean and population standard deviation over an ensemble of grids.
///
/// Grids must be pushed in realization order. Each cell keeps the running sum, which
/// gives the mean exactly as `mean_axis(Axis(0))` over the stacked ensemble does, and
/// the single pass mean / squared deviation recurrence used by `std_axis(Axis(0), 0.0)`.
/// Both results are bit-identical to that materialized computation over the values that
/// reached each cell, except that a constant cell reports its value exactly.
#[derive(Debug, Clone)]
pub struct EnsembleAccumulator {
    count: Array2<u32>,
    sum: Array2<f64>,
    running_mean: Array2<f64>,
    m2: Array2<f64>,
    n_grids: usize,
    nodata: f64,
    policy: NoDataPolicy,
}

impl EnsembleAccumulator {
    pub fn new(shape: (usize, usize), nodata: f64, policy: NoDataPolicy) -> Self {
        Self {
            count: Array2::zeros(shape),
            sum: Array2::zeros(shape),
            running_mean: Array2::zeros(shape),
            m2: Array2::zeros(shape),
            n_grids: 0,
            nodata,
            policy,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.sum.dim()
    }

    /// Number of grids folded in so far.
    pub fn n_grids(&self) -> usize {
        self.n_grids
    }

    pub fn push(&mut self, grid: &Grid) -> Result<()> {
        if grid.dim() != self.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.shape(),
                actual: grid.dim(),
            });
        }

        let nodata = self.nodata;
        let policy = self.policy;

        Zip::from(&mut self.count)
            .and(&mut self.sum)
            .and(&mut self.running_mean)
            .and(&mut self.m2)
            .and(grid)
            .for_each(|count, sum, mean, m2, &value| {
                if policy.skips(value, nodata) {
                    return;
                }
                *count += 1;
                *sum += value;
                let delta = value - *mean;
                *mean += delta / *count as f64;
                *m2 = (value - *mean).mul_add(delta, *m2);
            });

        self.n_grids += 1;
        Ok(())
    }

    /// Cell-wise mean and population standard deviation.
    ///
    /// Cells that received no values hold the no-data sentinel in both grids. A cell whose
    /// values were all identical has that value as its mean and a standard deviation of
    /// exactly zero.
    pub fn finish(self) -> (Grid, Grid) {
        let nodata = self.nodata;
        let shape = self.shape();

        let mut mean = Array2::zeros(shape);
        let mut std = Array2::zeros(shape);
        Zip::from(&mut mean)
            .and(&mut std)
            .and(&self.count)
            .and(&self.sum)
            .and(&self.running_mean)
            .and(&self.m2)
            .for_each(|m, s, &count, &sum, &running_mean, &m2| {
                if count == 0 {
                    *m = nodata;
                    *s = nodata;
                    return;
                }
                let n = count as f64;
                // no spread: the running mean is the repeated value itself
                *m = if m2 == 0.0 { running_mean } else { sum / n };
                *s = (m2 / n).sqrt();
            });

        (mean, std)
    }
}
