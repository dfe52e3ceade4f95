//! Report generation port trait.

use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::EmacrossError;

/// Port for writing backtest artifacts into an output directory.
pub trait ReportPort {
    /// Write the artifacts for `ticker` and return the paths written.
    fn write(
        &self,
        result: &BacktestResult,
        ticker: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, EmacrossError>;
}
