pub mod config;
pub mod error;
pub mod estimators;
pub mod geometry;
pub mod pipeline;
pub mod raster;
pub mod reprojection;
pub mod simulation;
pub mod spatial_database;

/// Dense grid of values, row 0 is the northern edge.
pub type Grid = ndarray::Array2<f64>;

/// Whether a cell holds the `nodata` sentinel. NaN counts as no-data too.
#[inline(always)]
pub fn is_nodata(value: f64, nodata: f64) -> bool {
    value.is_nan() || value == nodata
}

pub mod prelude {

    pub mod re_exports {
        pub use ndarray;
        pub use rand;
        pub use rstar;
    }

    pub use crate::config::RunConfig;
    pub use crate::error::{Error, Result, Stage};
    pub use crate::estimators::{
        inverse_distance::InverseDistanceNearestNeighbor, InterpolationParams, Interpolator,
    };
    pub use crate::geometry::{BoundingBox, GridSpec, LEGACY_BASE_DIMENSIONS};
    pub use crate::pipeline::{run as run_pipeline, RunOutputs};
    pub use crate::raster::{GeoTiffWriter, RasterMetadata, RasterWriter};
    pub use crate::reprojection::{CommandRunner, Reprojector, SystemCommandRunner};
    pub use crate::simulation::{
        BootstrapEstimator, BootstrapParams, CancellationToken, NoDataPolicy, ResultSet,
    };
    pub use crate::spatial_database::{PointSet, SamplePoint};
    pub use crate::Grid;
}
