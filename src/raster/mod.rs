//! Georeferenced raster output

use std::path::Path;

use crate::error::Result;
use crate::geometry::GridSpec;
use crate::Grid;

pub mod geotiff;

pub use geotiff::GeoTiffWriter;

/// Georeferencing written alongside a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterMetadata {
    /// Upper-left corner `(x, y)`
    pub origin: (f64, f64),
    /// `(dx, dy)`, `dy` negative for north-up grids
    pub cell_size: (f64, f64),
    pub band_count: usize,
    /// EPSG code of the grid coordinates
    pub epsg: u32,
    pub nodata: Option<f64>,
}

impl RasterMetadata {
    pub fn from_grid_spec(spec: &GridSpec, epsg: u32, nodata: f64) -> Self {
        Self {
            origin: spec.origin(),
            cell_size: spec.cell_size(),
            band_count: 1,
            epsg,
            nodata: Some(nodata),
        }
    }
}

/// Serializes a grid to a raster file.
pub trait RasterWriter {
    fn write(&self, path: &Path, grid: &Grid, metadata: &RasterMetadata) -> Result<()>;
}
