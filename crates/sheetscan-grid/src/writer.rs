use std::path::{Path, PathBuf};

use tracing::info;

use crate::csv_out::write_csv;
use crate::error::GridError;
use crate::model::Grid;
use crate::xlsx::write_xlsx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xlsx,
    Csv,
}

impl OutputFormat {
    /// `.csv` selects comma-separated text; every other name gets a workbook.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Xlsx,
        }
    }
}

/// Places the file name component of `filename` inside `output_dir`.
///
/// # Errors
/// Returns [`GridError::InvalidOption`] when `filename` has no file name.
pub fn resolve_output_path(output_dir: &Path, filename: &Path) -> Result<PathBuf, GridError> {
    let name = filename.file_name().ok_or_else(|| {
        GridError::InvalidOption(format!(
            "output name '{}' has no file name",
            filename.display()
        ))
    })?;
    Ok(output_dir.join(name))
}

/// Writes `grid` to `output_dir/<file name of filename>`, creating the
/// directory when needed and replacing any existing file.
///
/// # Errors
/// Returns an error when the directory or file cannot be written.
pub fn write_grid(grid: &Grid, output_dir: &Path, filename: &Path) -> Result<PathBuf, GridError> {
    let path = resolve_output_path(output_dir, filename)?;
    std::fs::create_dir_all(output_dir)?;

    let format = OutputFormat::from_path(&path);
    match format {
        OutputFormat::Xlsx => write_xlsx(&path, grid)?,
        OutputFormat::Csv => write_csv(&path, grid.rows(), b',')?,
    }

    info!(
        path = %path.display(),
        ?format,
        rows = grid.height(),
        columns = grid.width(),
        "grid written"
    );
    Ok(path)
}
