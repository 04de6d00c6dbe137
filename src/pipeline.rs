//! End to end run: read points, bootstrap, write and reproject rasters

use std::fs;
use std::path::PathBuf;

use itertools::{Itertools, MinMaxResult};
use rand::Rng;
use tracing::info;

use crate::config::{InputConfig, OutputConfig, RunConfig};
use crate::error::{Error, Result};
use crate::estimators::Interpolator;
use crate::geometry::GridSpec;
use crate::raster::{RasterMetadata, RasterWriter};
use crate::reprojection::{CommandRunner, Reprojector};
use crate::simulation::{BootstrapEstimator, CancellationToken, ResultSet};
use crate::spatial_database::PointSet;
use crate::Grid;

/// The four surfaces written per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Full,
    Mean,
    Std,
    ZScore,
}

impl Surface {
    pub const ALL: [Surface; 4] = [Surface::Full, Surface::Mean, Surface::Std, Surface::ZScore];

    fn suffix(&self) -> &'static str {
        match self {
            Surface::Full => "",
            Surface::Mean => "_mean",
            Surface::Std => "_std",
            Surface::ZScore => "_zscore",
        }
    }

    pub fn grid<'a>(&self, results: &'a ResultSet) -> &'a Grid {
        match self {
            Surface::Full => &results.full,
            Surface::Mean => &results.mean,
            Surface::Std => &results.std,
            Surface::ZScore => &results.zscore,
        }
    }

    /// `<dir>/<prefix><suffix>_<source_epsg>.tiff`
    pub fn native_path(&self, output: &OutputConfig) -> PathBuf {
        output.directory.join(format!(
            "{}{}_{}.tiff",
            output.prefix,
            self.suffix(),
            output.source_epsg
        ))
    }

    /// `<dir>/<prefix><suffix>.tiff`
    pub fn reprojected_path(&self, output: &OutputConfig) -> PathBuf {
        output
            .directory
            .join(format!("{}{}.tiff", output.prefix, self.suffix()))
    }
}

#[derive(Debug)]
pub struct RunOutputs {
    pub results: ResultSet,
    /// Rasters in the source coordinate system
    pub written: Vec<PathBuf>,
    /// Rasters warped to the target coordinate system, empty when reprojection is off
    pub reprojected: Vec<PathBuf>,
}

pub fn load_dataset(input: &InputConfig) -> Result<PointSet> {
    info!(path = %input.path.display(), "reading point dataset");
    let dataset = PointSet::from_csv_index(
        &input.path,
        &input.x_column,
        &input.y_column,
        &input.value_column,
    )?;

    let bounds = dataset.bounds();
    let limits = match dataset.points().iter().map(|p| p.value).minmax_by(f64::total_cmp) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
    };
    info!(
        n_points = dataset.len(),
        bounds = ?bounds.to_array(),
        value_range = ?limits,
        "point dataset loaded"
    );
    Ok(dataset)
}

/// Run the bootstrap on `dataset` and write every surface.
/// # Arguments
/// * `config` - grid, bootstrap and output settings, `config.input` is not read
/// * `dataset` - conditioning points
/// * `interpolator` - kernel used for the full surface and every realization
/// * `writer` - raster serializer
/// * `reprojector` - used when `config.output.target_epsg` is set
/// * `rng` - source of the per-realization seeds
/// * `cancel` - checked between realizations
pub fn run<I, W, C, R>(
    config: &RunConfig,
    dataset: &PointSet,
    interpolator: I,
    writer: &W,
    reprojector: &Reprojector<C>,
    rng: &mut R,
    cancel: &CancellationToken,
) -> Result<RunOutputs>
where
    I: Interpolator,
    W: RasterWriter + ?Sized,
    C: CommandRunner,
    R: Rng + ?Sized,
{
    config.validate()?;

    let grid = GridSpec::from_bounds(
        dataset.bounds(),
        config.grid.divisor,
        config.grid.base_dimensions,
    )?;
    info!(
        width = grid.width,
        height = grid.height,
        cell_size = ?grid.cell_size(),
        "grid derived from data extent"
    );

    let estimator = BootstrapEstimator::new(
        dataset,
        grid,
        interpolator,
        config.interpolation,
        config.bootstrap.clone(),
    )?;
    let results = estimator.estimate(rng, cancel)?;

    let output = &config.output;
    fs::create_dir_all(&output.directory).map_err(|e| Error::Output {
        path: output.directory.clone(),
        reason: e.to_string(),
    })?;

    let metadata = RasterMetadata::from_grid_spec(
        &results.grid_spec,
        output.source_epsg,
        config.interpolation.nodata,
    );

    let mut written = Vec::with_capacity(Surface::ALL.len());
    for surface in Surface::ALL {
        let path = surface.native_path(output);
        writer.write(&path, surface.grid(&results), &metadata)?;
        written.push(path);
    }
    info!(n_rasters = written.len(), directory = %output.directory.display(), "rasters written");

    let mut reprojected = Vec::new();
    if let Some(target_epsg) = output.target_epsg {
        for (surface, input) in Surface::ALL.iter().zip(&written) {
            let path = surface.reprojected_path(output);
            reprojector.reproject(input, &path, output.source_epsg, target_epsg)?;
            reprojected.push(path);
        }
    }

    Ok(RunOutputs {
        results,
        written,
        reprojected,
    })
}
