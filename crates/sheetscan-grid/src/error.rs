use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("no text fragments to cluster")]
    EmptyInput,

    #[error("file '{}' has no rows", path.display())]
    EmptyFile { path: PathBuf },

    #[error("invalid column type mapping: {0}")]
    InvalidColumnTypes(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}
