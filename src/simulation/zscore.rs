use ndarray::{Array2, Zip};

use crate::error::{Error, Result};
use crate::{is_nodata, Grid};

/// Cell-wise `|full - mean| / std`.
///
/// Cells where `std` is zero, or where any input is `nodata` or NaN, are set to `nodata`.
pub fn zscore(full: &Grid, mean: &Grid, std: &Grid, nodata: f64) -> Result<Grid> {
    for other in [mean, std] {
        if other.dim() != full.dim() {
            return Err(Error::ShapeMismatch {
                expected: full.dim(),
                actual: other.dim(),
            });
        }
    }

    let mut out = Array2::zeros(full.dim());
    Zip::from(&mut out)
        .and(full)
        .and(mean)
        .and(std)
        .for_each(|z, &f, &m, &s| {
            *z = if is_nodata(f, nodata)
                || is_nodata(m, nodata)
                || is_nodata(s, nodata)
                || s == 0.0
            {
                nodata
            } else {
                (f - m).abs() / s
            };
        });

    Ok(out)
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use ndarray::arr2;

    use super::*;

    const NODATA: f64 = -9999.0;

    #[test]
    fn absolute_standardized_difference() {
        let full = arr2(&[[10.0, 4.0]]);
        let mean = arr2(&[[12.0, 1.0]]);
        let std = arr2(&[[0.5, 2.0]]);

        let z = zscore(&full, &mean, &std, NODATA).unwrap();
        assert_relative_eq!(z[[0, 0]], 4.0);
        assert_relative_eq!(z[[0, 1]], 1.5);
    }

    #[test]
    fn zero_std_gives_sentinel() {
        let full = arr2(&[[10.0, 10.0]]);
        let mean = arr2(&[[10.0, 9.0]]);
        let std = arr2(&[[0.0, 0.0]]);

        let z = zscore(&full, &mean, &std, NODATA).unwrap();
        assert!(z.iter().all(|&v| v == NODATA));
    }

    #[test]
    fn nodata_inputs_propagate() {
        let full = arr2(&[[NODATA, 3.0, f64::NAN]]);
        let mean = arr2(&[[1.0, NODATA, 1.0]]);
        let std = arr2(&[[1.0, 1.0, 1.0]]);

        let z = zscore(&full, &mean, &std, NODATA).unwrap();
        assert!(z.iter().all(|&v| v == NODATA));
    }

    #[test]
    fn mismatched_shapes_rejected() {
        let full = Array2::zeros((2, 3));
        let mean = Array2::zeros((3, 2));
        let std = Array2::zeros((2, 3));
        assert!(matches!(
            zscore(&full, &mean, &std, NODATA),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
