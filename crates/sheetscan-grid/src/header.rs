fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim().replace(',', "");
    trimmed.parse::<f64>().is_ok()
}

fn non_numeric_ratio(cells: &[String]) -> f32 {
    let filled = cells
        .iter()
        .filter(|cell| !cell.trim().is_empty())
        .collect::<Vec<_>>();
    if filled.is_empty() {
        return 0.0;
    }

    let non_numeric = filled.iter().filter(|cell| !is_numeric(cell)).count();
    non_numeric as f32 / filled.len() as f32
}

/// Scores how much the first row reads like column names rather than data.
///
/// Returns the verdict and a confidence in `0.0..=1.0`. Padding cells are
/// ignored.
pub(crate) fn infer_has_header(rows: &[Vec<String>]) -> (bool, f32) {
    if rows.is_empty() {
        return (false, 0.0);
    }

    let first = non_numeric_ratio(&rows[0]);
    let Some(second) = rows.get(1).map(|row| non_numeric_ratio(row)) else {
        return (first >= 0.6, first);
    };

    let confidence = (first * 0.6 + (1.0 - second) * 0.4).clamp(0.0, 1.0);
    (first >= 0.6 || first > second, confidence)
}
