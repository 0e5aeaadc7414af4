pub mod config;
pub mod error;
pub mod header_check;
pub mod models;
pub mod ocr;
pub mod pipeline;

pub use config::AppConfig;
pub use error::ConvertError;
pub use pipeline::{ConversionReport, Converter, build_converter};
