//! Groups OCR fragments into table rows using only each fragment's anchor.
//!
//! Fragments are sorted by `(y, x)`, scanned top to bottom, and a fragment
//! joins the open row while its y stays within the threshold of the row's
//! reference y. Rows are then padded on the right to the widest row. No
//! attempt is made to align columns across rows.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::GridError;
use crate::header::infer_has_header;
use crate::model::{Grid, TextFragment};
use crate::options::{ClusterOptions, RowAnchor, RowOrder};
use crate::warning::{ClusterWarning, WarningCode};

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterReport {
    pub grid: Grid,
    pub warnings: Vec<ClusterWarning>,
}

struct RowGroup<'a> {
    members: Vec<&'a TextFragment>,
    reference_y: f64,
    sum_y: f64,
    min_y: f64,
    max_y: f64,
}

impl<'a> RowGroup<'a> {
    fn start(fragment: &'a TextFragment) -> Self {
        let y = fragment.anchor().y;
        Self {
            members: vec![fragment],
            reference_y: y,
            sum_y: y,
            min_y: y,
            max_y: y,
        }
    }

    fn accepts(&self, y: f64, threshold: f64) -> bool {
        (y - self.reference_y).abs() < threshold
    }

    fn push(&mut self, fragment: &'a TextFragment, anchor: RowAnchor) {
        let y = fragment.anchor().y;
        self.members.push(fragment);
        self.sum_y += y;
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        if anchor == RowAnchor::RunningMean {
            self.reference_y = self.sum_y / self.members.len() as f64;
        }
    }

    fn last_y(&self) -> f64 {
        self.members
            .last()
            .map_or(self.reference_y, |member| member.anchor().y)
    }

    fn spread(&self) -> f64 {
        self.max_y - self.min_y
    }
}

fn scan_order(left: &TextFragment, right: &TextFragment) -> Ordering {
    let (left, right) = (left.anchor(), right.anchor());
    left.y.total_cmp(&right.y).then(left.x.total_cmp(&right.x))
}

fn group_rows<'a>(
    sorted: &[&'a TextFragment],
    options: &ClusterOptions,
    warnings: &mut Vec<ClusterWarning>,
) -> Vec<RowGroup<'a>> {
    let Some((first, rest)) = sorted.split_first() else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    let mut current = RowGroup::start(first);

    for fragment in rest {
        let y = fragment.anchor().y;
        if current.accepts(y, options.threshold) {
            current.push(fragment, options.anchor);
            continue;
        }

        let gap = y - current.last_y();
        let closed = std::mem::replace(&mut current, RowGroup::start(fragment));
        rows.push(closed);

        if gap < options.threshold {
            warnings.push(
                ClusterWarning::new(
                    WarningCode::RowSplit,
                    "fragment started a new row although it sits close to the previous row's last cell",
                )
                .with_row(rows.len())
                .with_distance(gap),
            );
        }
    }
    rows.push(current);

    rows
}

/// Clusters fragments into a rectangular grid.
///
/// # Errors
/// Returns [`GridError::EmptyInput`] for an empty fragment set and
/// [`GridError::InvalidOption`] for a non-positive or non-finite threshold.
pub fn cluster_fragments(
    fragments: &[TextFragment],
    options: &ClusterOptions,
) -> Result<ClusterReport, GridError> {
    if !options.threshold.is_finite() || options.threshold <= 0.0 {
        return Err(GridError::InvalidOption(format!(
            "row threshold must be a positive number, got {}",
            options.threshold
        )));
    }
    if fragments.is_empty() {
        return Err(GridError::EmptyInput);
    }

    let mut sorted = fragments.iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| scan_order(left, right));

    let mut warnings = Vec::new();
    let mut groups = group_rows(&sorted, options, &mut warnings);

    for (index, group) in groups.iter_mut().enumerate() {
        if group.spread() >= options.threshold {
            warnings.push(
                ClusterWarning::new(
                    WarningCode::RowDrift,
                    "row members drift further apart vertically than the row threshold",
                )
                .with_row(index)
                .with_distance(group.spread()),
            );
        }
        if options.order == RowOrder::LeftToRight {
            group
                .members
                .sort_by(|left, right| left.anchor().x.total_cmp(&right.anchor().x));
        }
    }

    let rows = groups
        .iter()
        .map(|group| {
            group
                .members
                .iter()
                .map(|member| member.text.clone())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let (has_header, confidence) = infer_has_header(&rows);
    if !has_header {
        warnings.push(
            ClusterWarning::new(
                WarningCode::NumericHeader,
                "first row looks like data rather than column names",
            )
            .with_row(0)
            .with_confidence(confidence),
        );
    }

    let short_rows = {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        rows.iter().filter(|row| row.len() < width).count()
    };
    if short_rows > 0 {
        warnings.push(ClusterWarning::new(
            WarningCode::RaggedRows,
            format!("{short_rows} row(s) padded with empty cells; columns are not aligned across rows"),
        ));
    }

    let grid = Grid::from_rows(rows)?;
    debug!(
        fragments = fragments.len(),
        rows = grid.height(),
        columns = grid.width(),
        "clustered fragments into grid"
    );

    Ok(ClusterReport { grid, warnings })
}
