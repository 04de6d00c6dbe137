use ndarray::Array2;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

use crate::error::{Error, Result};
use crate::geometry::GridSpec;
use crate::spatial_database::PointSet;
use crate::Grid;

use super::{InterpolationParams, Interpolator};

// squared distance under which a node takes the sample value directly
const COINCIDENT_DIST_SQ: f64 = 1e-13;

/// Inverse distance to a power, restricted to the nearest points inside a search radius.
///
/// For every node the `max_points` nearest samples within `radius` are weighted by
/// `1 / (d² + smoothing²)^(power / 2)`. Nodes with fewer than `max(min_points, 1)`
/// samples in range are set to `nodata`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InverseDistanceNearestNeighbor;

impl InverseDistanceNearestNeighbor {
    /// Estimate a single location.
    pub fn estimate_at(
        &self,
        points: &PointSet,
        x: f64,
        y: f64,
        params: &InterpolationParams,
    ) -> f64 {
        let smoothing_sq = params.smoothing * params.smoothing;
        let half_power = params.power / 2.0;

        let mut n_cond = 0;
        let mut sum_w = 0.0;
        let mut sum_wz = 0.0;

        for (point, dist_sq) in points.nearest_within(x, y, params.radius, params.max_points) {
            let r_sq = dist_sq + smoothing_sq;

            // node lies on a sample
            if r_sq < COINCIDENT_DIST_SQ {
                return point.value;
            }

            let w = r_sq.powf(half_power).recip();
            sum_w += w;
            sum_wz += w * point.value;
            n_cond += 1;
        }

        if n_cond == 0 || n_cond < params.min_points {
            params.nodata
        } else {
            sum_wz / sum_w
        }
    }
}

impl Interpolator for InverseDistanceNearestNeighbor {
    fn interpolate(
        &self,
        points: &PointSet,
        grid: &GridSpec,
        params: &InterpolationParams,
    ) -> Result<Grid> {
        params.validate()?;

        let (rows, cols) = grid.shape();
        let data = (0..rows)
            .into_par_iter()
            .flat_map_iter(|row| {
                (0..cols).map(move |col| {
                    let (x, y) = grid.node(row, col);
                    self.estimate_at(points, x, y, params)
                })
            })
            .collect::<Vec<_>>();

        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Interpolation {
            realization: None,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use crate::geometry::BoundingBox;
    use crate::spatial_database::SamplePoint;

    use super::*;

    fn square_with_center() -> PointSet {
        PointSet::new(vec![
            SamplePoint::new(0.0, 0.0, 10.0),
            SamplePoint::new(1.0, 0.0, 20.0),
            SamplePoint::new(0.0, 1.0, 30.0),
            SamplePoint::new(1.0, 1.0, 40.0),
            SamplePoint::new(0.5, 0.5, 25.0),
        ])
        .unwrap()
    }

    #[test]
    fn nodes_on_samples_take_sample_values() {
        let points = square_with_center();
        let spec = GridSpec::with_dimensions(points.bounds(), 3, 3).unwrap();
        let params = InterpolationParams {
            radius: 10.0,
            ..Default::default()
        };

        let grid = InverseDistanceNearestNeighbor
            .interpolate(&points, &spec, &params)
            .unwrap();

        assert_eq!(grid.dim(), (3, 3));
        // row 0 is the top edge (y = 1)
        assert_eq!(grid[[0, 0]], 30.0);
        assert_eq!(grid[[0, 2]], 40.0);
        assert_eq!(grid[[2, 0]], 10.0);
        assert_eq!(grid[[2, 2]], 20.0);
        assert_eq!(grid[[1, 1]], 25.0);
    }

    #[test]
    fn equidistant_samples_average() {
        let points = PointSet::new(vec![
            SamplePoint::new(-1.0, 0.0, 10.0),
            SamplePoint::new(1.0, 0.0, 30.0),
        ])
        .unwrap();
        let value = InverseDistanceNearestNeighbor.estimate_at(
            &points,
            0.0,
            0.0,
            &InterpolationParams::default(),
        );
        assert_relative_eq!(value, 20.0);
    }

    #[test]
    fn weights_follow_power() {
        let points = PointSet::new(vec![
            SamplePoint::new(1.0, 0.0, 0.0),
            SamplePoint::new(-2.0, 0.0, 10.0),
        ])
        .unwrap();
        // weights 1 and 1/4
        let value = InverseDistanceNearestNeighbor.estimate_at(
            &points,
            0.0,
            0.0,
            &InterpolationParams::default(),
        );
        assert_relative_eq!(value, 10.0 * 0.25 / 1.25);
    }

    #[test]
    fn out_of_radius_is_nodata() {
        let points = PointSet::new(vec![SamplePoint::new(0.0, 0.0, 5.0)]).unwrap();
        let params = InterpolationParams {
            radius: 1.0,
            ..Default::default()
        };
        let bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let spec = GridSpec::with_dimensions(bounds, 2, 2).unwrap();

        let grid = InverseDistanceNearestNeighbor
            .interpolate(&points, &spec, &params)
            .unwrap();
        assert_eq!(grid[[1, 0]], 5.0);
        assert_eq!(grid[[0, 1]], params.nodata);
    }

    #[test]
    fn min_points_enforced() {
        let points = square_with_center();
        let params = InterpolationParams {
            radius: 0.45,
            min_points: 3,
            ..Default::default()
        };
        // only the center sample is within 0.45 of (0.5, 0.9)
        let value = InverseDistanceNearestNeighbor.estimate_at(&points, 0.5, 0.9, &params);
        assert_eq!(value, params.nodata);
    }

    #[test]
    fn invalid_params_fail() {
        let points = square_with_center();
        let spec = GridSpec::with_dimensions(points.bounds(), 2, 2).unwrap();
        let params = InterpolationParams {
            radius: -1.0,
            ..Default::default()
        };
        assert!(InverseDistanceNearestNeighbor
            .interpolate(&points, &spec, &params)
            .is_err());
    }
}
