use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::GridSpec;
use crate::spatial_database::PointSet;
use crate::Grid;

pub mod inverse_distance;

/// Produces a dense grid of estimates from a set of conditioning points.
pub trait Interpolator: Sync {
    /// Estimate every node of `grid` from `points`.
    /// The returned grid has shape `grid.shape()`. Nodes that cannot be estimated hold
    /// `params.nodata`.
    fn interpolate(
        &self,
        points: &PointSet,
        grid: &GridSpec,
        params: &InterpolationParams,
    ) -> Result<Grid>;
}

impl<T: Interpolator + ?Sized> Interpolator for &T {
    fn interpolate(
        &self,
        points: &PointSet,
        grid: &GridSpec,
        params: &InterpolationParams,
    ) -> Result<Grid> {
        (**self).interpolate(points, grid, params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationParams {
    //search radius, same units as the point coordinates
    pub radius: f64,
    pub nodata: f64,
    pub smoothing: f64,
    pub power: f64,

    //limits on the number of conditioning points per node
    pub max_points: usize,
    pub min_points: usize,
}

impl InterpolationParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(Error::invalid_parameter(
                "radius",
                self.radius,
                "must be positive and finite",
            ));
        }
        if !(self.power.is_finite() && self.power >= 0.0) {
            return Err(Error::invalid_parameter(
                "power",
                self.power,
                "must be non-negative",
            ));
        }
        if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
            return Err(Error::invalid_parameter(
                "smoothing",
                self.smoothing,
                "must be non-negative",
            ));
        }
        if self.nodata.is_nan() {
            return Err(Error::invalid_parameter("nodata", self.nodata, "must be a number"));
        }
        if self.max_points == 0 {
            return Err(Error::invalid_parameter(
                "max_points",
                self.max_points,
                "must be at least 1",
            ));
        }
        if self.min_points > self.max_points {
            return Err(Error::invalid_parameter(
                "min_points",
                self.min_points,
                format!("exceeds max_points = {}", self.max_points),
            ));
        }
        Ok(())
    }
}

impl Default for InterpolationParams {
    fn default() -> Self {
        Self {
            radius: 25_000.0,
            nodata: -9999.0,
            smoothing: 0.0,
            power: 2.0,
            max_points: 12,
            min_points: 0,
        }
    }
}
