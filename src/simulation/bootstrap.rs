use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressIterator, ProgressStyle};
use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use rayon::current_num_threads;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::estimators::{InterpolationParams, Interpolator};
use crate::geometry::GridSpec;
use crate::spatial_database::PointSet;
use crate::Grid;

use super::accumulator::{EnsembleAccumulator, NoDataPolicy};
use super::zscore::zscore;

/// Which points condition a realization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    /// Every point in the dataset.
    Full,
    /// `floor(fraction * n)` points drawn uniformly without replacement.
    Subsample(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapParams {
    pub nsims: usize,
    pub sample_fraction: f64,
    //run realizations on the rayon pool
    pub parallel: bool,
    //extra attempts for a failed interpolation before giving up
    pub max_retries: usize,
    pub nodata_policy: NoDataPolicy,
    pub progress: bool,
}

impl BootstrapParams {
    pub fn validate(&self) -> Result<()> {
        if self.nsims == 0 {
            return Err(Error::invalid_parameter(
                "nsims",
                self.nsims,
                "at least one realization is required",
            ));
        }
        validate_fraction(self.sample_fraction)
    }
}

impl Default for BootstrapParams {
    fn default() -> Self {
        Self {
            nsims: 1000,
            sample_fraction: 0.8,
            parallel: true,
            max_retries: 0,
            nodata_policy: NoDataPolicy::Exclude,
            progress: true,
        }
    }
}

/// Shared flag checked before every realization.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The four output surfaces, all of shape `grid_spec.shape()`.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub full: Grid,
    pub mean: Grid,
    pub std: Grid,
    pub zscore: Grid,
    pub grid_spec: GridSpec,
}

fn validate_fraction(fraction: f64) -> Result<()> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(Error::invalid_parameter(
            "sample_fraction",
            fraction,
            "must be in (0, 1]",
        ));
    }
    Ok(())
}

/// Number of points a subsample of `n` draws.
pub fn sample_size(n: usize, fraction: f64) -> usize {
    (fraction * n as f64).floor() as usize
}

fn check_sample(n: usize, fraction: f64) -> Result<usize> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(Error::Sampling {
            realization: None,
            reason: format!("sample fraction {fraction} is outside (0, 1]"),
        });
    }
    let amount = sample_size(n, fraction);
    if amount == 0 {
        return Err(Error::Sampling {
            realization: None,
            reason: format!("fraction {fraction} selects no points from a dataset of {n}"),
        });
    }
    Ok(amount)
}

/// Distinct indices into a dataset of `n` points, ascending.
pub fn sample_indices<R: Rng + ?Sized>(n: usize, fraction: f64, rng: &mut R) -> Result<Vec<usize>> {
    let amount = check_sample(n, fraction)?;

    let mut inds = index::sample(rng, n, amount).into_vec();
    inds.sort_unstable();
    Ok(inds)
}

/// Conditioning points for one realization.
pub fn draw<'a, R: Rng + ?Sized>(
    dataset: &'a PointSet,
    sampling: Sampling,
    rng: &mut R,
) -> Result<Cow<'a, PointSet>> {
    match sampling {
        Sampling::Full => Ok(Cow::Borrowed(dataset)),
        Sampling::Subsample(fraction) => {
            let inds = sample_indices(dataset.len(), fraction, rng)?;
            let subset = dataset.subset(&inds).map_err(|e| Error::Sampling {
                realization: None,
                reason: e.to_string(),
            })?;
            Ok(Cow::Owned(subset))
        }
    }
}

fn check_grid(grid: Grid, spec: &GridSpec) -> Result<Grid> {
    if grid.dim() != spec.shape() {
        return Err(Error::ShapeMismatch {
            expected: spec.shape(),
            actual: grid.dim(),
        });
    }
    Ok(grid)
}

/// Draw the conditioning points and interpolate them onto `grid`.
/// `Sampling::Full` consumes no randomness.
pub fn realization<I, R>(
    dataset: &PointSet,
    grid: &GridSpec,
    sampling: Sampling,
    interpolator: &I,
    params: &InterpolationParams,
    rng: &mut R,
) -> Result<Grid>
where
    I: Interpolator + ?Sized,
    R: Rng + ?Sized,
{
    let points = draw(dataset, sampling, rng)?;
    let values = interpolator.interpolate(&points, grid, params)?;
    check_grid(values, grid)
}

fn tag_realization(err: Error, index: usize) -> Error {
    match err {
        Error::Sampling { reason, .. } => Error::Sampling {
            realization: Some(index),
            reason,
        },
        Error::Interpolation { reason, .. } => Error::Interpolation {
            realization: Some(index),
            reason,
        },
        other => Error::Interpolation {
            realization: Some(index),
            reason: other.to_string(),
        },
    }
}

const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] {bar:40} {pos}/{len} realizations ({eta})";

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    match ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        Ok(style) => pb.set_style(style),
        Err(err) => debug!(error = %err, "invalid progress template, using default style"),
    }
    pb
}

/// Bootstrap estimator of an interpolated surface and its variability.
pub struct BootstrapEstimator<'a, I> {
    dataset: &'a PointSet,
    grid: GridSpec,
    interpolator: I,
    interpolation_params: InterpolationParams,
    params: BootstrapParams,
}

impl<'a, I> BootstrapEstimator<'a, I>
where
    I: Interpolator,
{
    /// Create a new bootstrap estimator
    /// # Arguments
    /// * `dataset` - measurements shared by every realization
    /// * `grid` - output grid geometry
    /// * `interpolator` - kernel producing one grid per realization
    /// * `interpolation_params` - kernel parameters, `nodata` is also the output sentinel
    /// * `params` - number of realizations, subsample fraction and execution options
    pub fn new(
        dataset: &'a PointSet,
        grid: GridSpec,
        interpolator: I,
        interpolation_params: InterpolationParams,
        params: BootstrapParams,
    ) -> Result<Self> {
        interpolation_params.validate()?;
        params.validate()?;
        check_sample(dataset.len(), params.sample_fraction)?;
        Ok(Self {
            dataset,
            grid,
            interpolator,
            interpolation_params,
            params,
        })
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn params(&self) -> &BootstrapParams {
        &self.params
    }

    /// Interpolation of the complete dataset.
    pub fn full(&self) -> Result<Grid> {
        let values = self
            .interpolator
            .interpolate(self.dataset, &self.grid, &self.interpolation_params)?;
        check_grid(values, &self.grid)
    }

    /// One subsampled realization, retried up to `max_retries` times on failure.
    fn seeded_realization(&self, index: usize, seed: u64) -> Result<Grid> {
        let mut rng = StdRng::seed_from_u64(seed);
        let points = draw(
            self.dataset,
            Sampling::Subsample(self.params.sample_fraction),
            &mut rng,
        )
        .map_err(|e| tag_realization(e, index))?;

        let mut attempt = 0;
        loop {
            let result = self
                .interpolator
                .interpolate(&points, &self.grid, &self.interpolation_params)
                .and_then(|values| check_grid(values, &self.grid));

            match result {
                Ok(values) => {
                    debug!(realization = index, n_points = points.len(), "realization done");
                    return Ok(values);
                }
                Err(err) if attempt < self.params.max_retries => {
                    attempt += 1;
                    warn!(realization = index, attempt, error = %err, "retrying realization");
                }
                Err(err) => return Err(tag_realization(err, index)),
            }
        }
    }

    /// Cell-wise mean and population standard deviation over `nsims` realizations.
    ///
    /// One seed per realization is drawn from `rng` up front, so the subsets do not
    /// depend on how realizations are scheduled. Grids are folded in realization order,
    /// parallel runs interpolate a batch at a time, so both modes give the same bits.
    /// Any failed realization fails the whole aggregation.
    pub fn aggregate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<(Grid, Grid)> {
        let nsims = self.params.nsims;
        let seeds = (0..nsims).map(|_| rng.gen::<u64>()).collect::<Vec<_>>();

        info!(
            nsims,
            sample_fraction = self.params.sample_fraction,
            sample_size = sample_size(self.dataset.len(), self.params.sample_fraction),
            parallel = self.params.parallel,
            "running bootstrap"
        );

        let mut acc = EnsembleAccumulator::new(
            self.grid.shape(),
            self.interpolation_params.nodata,
            self.params.nodata_policy,
        );
        let pb = progress_bar(nsims, self.params.progress);

        if self.params.parallel {
            let batch = (2 * current_num_threads()).max(1);
            for (b, batch_seeds) in seeds.chunks(batch).enumerate() {
                let offset = b * batch;
                let completed = acc.n_grids();
                let grids = batch_seeds
                    .par_iter()
                    .enumerate()
                    .progress_with(pb.clone())
                    .map(|(j, &seed)| {
                        if cancel.is_cancelled() {
                            return Err(Error::Cancelled { completed });
                        }
                        self.seeded_realization(offset + j, seed)
                    })
                    .collect::<Result<Vec<_>>>()?;

                for values in &grids {
                    acc.push(values)?;
                }
            }
        } else {
            for (i, &seed) in seeds.iter().enumerate().progress_with(pb.clone()) {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled { completed: i });
                }
                let values = self.seeded_realization(i, seed)?;
                acc.push(&values)?;
            }
        }
        pb.finish_and_clear();

        debug_assert_eq!(acc.n_grids(), nsims);
        Ok(acc.finish())
    }

    /// Full-data surface, bootstrap mean/std and the z-score of the former against the latter.
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<ResultSet> {
        info!(n_points = self.dataset.len(), "interpolating full dataset");
        let full = self.full()?;

        let (mean, std) = self.aggregate(rng, cancel)?;

        let zscore = zscore(&full, &mean, &std, self.interpolation_params.nodata)?;

        Ok(ResultSet {
            full,
            mean,
            std,
            zscore,
            grid_spec: self.grid,
        })
    }
}
