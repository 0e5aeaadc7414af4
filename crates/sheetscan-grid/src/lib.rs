mod cluster;
mod csv_out;
mod error;
mod header;
mod model;
mod options;
mod retype;
mod warning;
mod writer;
mod xlsx;

pub use cluster::{ClusterReport, cluster_fragments};
pub use error::GridError;
pub use model::{Grid, Point, TextFragment};
pub use options::{ClusterOptions, ROW_THRESHOLD, RowAnchor, RowOrder};
pub use retype::{
    ColumnType, ColumnTypeMap, RetypeReport, normalize_number, parse_column_types, retype_csv,
    retype_rows,
};
pub use warning::{ClusterWarning, WarningCode as ClusterWarningCode};
pub use writer::{OutputFormat, resolve_output_path, write_grid};
