//! Reprojection of written rasters through an external `gdalwarp` process

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Outcome of an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an external program to completion.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<CommandOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<CommandOutput> {
        (**self).run(program, args)
    }
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub const GDALWARP: &str = "gdalwarp";

/// Warps rasters between EPSG coordinate systems.
pub struct Reprojector<C> {
    runner: C,
    program: String,
}

impl Reprojector<SystemCommandRunner> {
    pub fn gdalwarp() -> Self {
        Self::new(SystemCommandRunner, GDALWARP)
    }
}

impl<C: CommandRunner> Reprojector<C> {
    pub fn new(runner: C, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Arguments passed to the warp program.
    pub fn arguments(
        input: &Path,
        output: &Path,
        source_epsg: u32,
        target_epsg: u32,
    ) -> Vec<OsString> {
        vec![
            "-s_srs".into(),
            format!("EPSG:{source_epsg}").into(),
            "-t_srs".into(),
            format!("EPSG:{target_epsg}").into(),
            "-overwrite".into(),
            input.as_os_str().to_owned(),
            output.as_os_str().to_owned(),
        ]
    }

    /// Warp `input` from `source_epsg` to `target_epsg`, writing `output`.
    /// A failure to start the program or a non-zero exit status is an error.
    pub fn reproject(
        &self,
        input: &Path,
        output: &Path,
        source_epsg: u32,
        target_epsg: u32,
    ) -> Result<()> {
        let args = Self::arguments(input, output, source_epsg, target_epsg);
        debug!(program = %self.program, ?args, "running reprojection");

        let result = self
            .runner
            .run(&self.program, &args)
            .map_err(|e| Error::Reprojection {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                code: None,
                stderr: format!("failed to run {}: {e}", self.program),
            })?;

        if !result.success() {
            return Err(Error::Reprojection {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                code: result.code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        info!(
            input = %input.display(),
            output = %output.display(),
            target_epsg,
            "raster reprojected"
        );
        Ok(())
    }
}
