use crate::error::{Error, Result};

use super::aabb::BoundingBox;

/// Grid dimensions used when the survey was first set up. Output grids are these
/// dimensions divided by the resolution divisor.
pub const LEGACY_BASE_DIMENSIONS: [usize; 2] = [1000, 1048];

/// Geometry of an output grid.
///
/// Nodes are laid out row-major from the top-left corner: node `(row, col)` sits at
/// `(origin_x + col * cell_width, origin_y + row * cell_height)`, with `cell_height`
/// negative so rows step down from `ymax` to `ymin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub bounds: BoundingBox,
}

impl GridSpec {
    /// Derive the grid for `bounds`.
    /// # Arguments
    /// * `bounds` - extent of the data, nodes span it edge to edge
    /// * `divisor` - resolution divisor applied to the base dimensions
    /// * `base_dimensions` - `[width, height]` before division, usually [`LEGACY_BASE_DIMENSIONS`]
    pub fn from_bounds(
        bounds: BoundingBox,
        divisor: usize,
        base_dimensions: [usize; 2],
    ) -> Result<Self> {
        if divisor == 0 {
            return Err(Error::invalid_parameter(
                "divisor",
                divisor,
                "must be at least 1",
            ));
        }

        let width = base_dimensions[0] / divisor;
        let height = base_dimensions[1] / divisor;
        Self::with_dimensions(bounds, width, height)
    }

    /// Grid with an explicit number of columns and rows.
    pub fn with_dimensions(bounds: BoundingBox, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_parameter(
                "grid dimensions",
                format!("{width}x{height}"),
                "width and height must be at least 1",
            ));
        }

        Ok(Self {
            width,
            height,
            origin_x: bounds.xmin,
            origin_y: bounds.ymax,
            cell_width: node_step(bounds.width(), width),
            cell_height: -node_step(bounds.height(), height),
            bounds,
        })
    }

    /// `(height, width)`, the shape of every grid built on this spec.
    #[inline(always)]
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// World coordinates of node `(row, col)`.
    #[inline(always)]
    pub fn node(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.cell_width,
            self.origin_y + row as f64 * self.cell_height,
        )
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x, self.origin_y)
    }

    pub fn cell_size(&self) -> (f64, f64) {
        (self.cell_width, self.cell_height)
    }
}

// linspace step, a single node covers the whole extent
fn node_step(extent: f64, n: usize) -> f64 {
    if n > 1 {
        extent / (n - 1) as f64
    } else {
        extent
    }
}
