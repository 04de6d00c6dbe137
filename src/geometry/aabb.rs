use crate::error::{Error, Result};

/// Axis aligned 2D extent of a point dataset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self> {
        if ![xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite()) {
            return Err(Error::invalid_parameter(
                "bounds",
                format!("[{xmin}, {ymin}, {xmax}, {ymax}]"),
                "coordinates must be finite",
            ));
        }
        if xmin > xmax || ymin > ymax {
            return Err(Error::invalid_parameter(
                "bounds",
                format!("[{xmin}, {ymin}, {xmax}, {ymax}]"),
                "min must not exceed max",
            ));
        }
        Ok(Self {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }

    /// Coordinate-wise min/max over a set of (x, y) locations.
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        coords.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Self {
                    xmin: x,
                    ymin: y,
                    xmax: x,
                    ymax: y,
                },
                Some(b) => Self {
                    xmin: b.xmin.min(x),
                    ymin: b.ymin.min(y),
                    xmax: b.xmax.max(x),
                    ymax: b.ymax.max(y),
                },
            })
        })
    }

    #[inline(always)]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[inline(always)]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// GDAL style `[xmin, ymin, xmax, ymax]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bounds_from_coords() {
        let b = BoundingBox::from_coords([(1.0, 5.0), (-2.0, 3.0), (4.0, -1.0)]).unwrap();
        assert_eq!(b.to_array(), [-2.0, -1.0, 4.0, 5.0]);
        assert_eq!((b.width(), b.height()), (6.0, 6.0));
    }

    #[test]
    fn empty_coords_have_no_bounds() {
        assert!(BoundingBox::from_coords(std::iter::empty()).is_none());
    }

    #[test]
    fn inverted_bounds_rejected() {
        assert!(BoundingBox::new(1.0, 0.0, 0.0, 1.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, f64::NAN, 1.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 0.0).is_ok());
    }
}
