//! Run configuration, loaded from JSON

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::estimators::InterpolationParams;
use crate::geometry::LEGACY_BASE_DIMENSIONS;
use crate::simulation::BootstrapParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: PathBuf,
    pub x_column: String,
    pub y_column: String,
    pub value_column: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("watertable.csv"),
            x_column: "x".into(),
            y_column: "y".into(),
            value_column: "watertable".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    //output dimensions are base_dimensions / divisor
    pub divisor: usize,
    pub base_dimensions: [usize; 2],
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            divisor: 4,
            base_dimensions: LEGACY_BASE_DIMENSIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub prefix: String,
    //EPSG code of the input coordinates
    pub source_epsg: u32,
    //rasters are also warped to this EPSG code when set
    pub target_epsg: Option<u32>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            prefix: "watertable_altitude".into(),
            source_epsg: 3438,
            target_epsg: Some(4326),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input: InputConfig,
    pub grid: GridConfig,
    pub interpolation: InterpolationParams,
    pub bootstrap: BootstrapParams,
    /// Seed for the bootstrap, drawn from entropy when absent
    pub seed: Option<u64>,
    pub output: OutputConfig,
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref()).map_err(|source| Error::ConfigRead {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.divisor == 0 {
            return Err(Error::invalid_parameter(
                "grid.divisor",
                self.grid.divisor,
                "must be at least 1",
            ));
        }
        if self.grid.base_dimensions.iter().any(|&d| d < self.grid.divisor) {
            return Err(Error::invalid_parameter(
                "grid.base_dimensions",
                format!("{:?}", self.grid.base_dimensions),
                format!("divisor {} leaves an empty grid", self.grid.divisor),
            ));
        }
        if self.output.prefix.is_empty() {
            return Err(Error::invalid_parameter(
                "output.prefix",
                "\"\"",
                "must not be empty",
            ));
        }
        self.interpolation.validate()?;
        self.bootstrap.validate()
    }
}
