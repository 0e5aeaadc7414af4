#![allow(dead_code)]

use std::io::Read;
use std::path::Path;

use sheetscan_grid::TextFragment;

/// Lays out a table as fragments, one per cell, `row_pitch` pixels apart
/// vertically and 120 pixels apart horizontally. `jitter` shifts every odd
/// cell down by that many pixels to imitate uneven OCR boxes.
pub fn table_fragments(rows: &[&[&str]], row_pitch: f64, jitter: f64) -> Vec<TextFragment> {
    let mut fragments = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        for (column_index, text) in row.iter().enumerate() {
            let x = 20.0 + column_index as f64 * 120.0;
            let shift = if column_index % 2 == 1 { jitter } else { 0.0 };
            let y = 30.0 + row_index as f64 * row_pitch + shift;
            fragments.push(TextFragment::from_rect(x, y, 90.0, 18.0, *text));
        }
    }
    fragments
}

pub fn read_zip_entry(path: &Path, name: &str) -> Result<String, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive.by_name(name)?;
    let mut body = String::new();
    entry.read_to_string(&mut body)?;
    Ok(body)
}
