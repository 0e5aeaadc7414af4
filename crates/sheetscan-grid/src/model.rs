use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Pixel coordinate in image space, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

/// One recognized text span and the quadrilateral it was found in.
///
/// Corners follow the OCR engine's order, which starts at the top-left
/// corner and runs clockwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFragment")]
pub struct TextFragment {
    #[serde(rename = "box")]
    pub corners: [Point; 4],
    pub text: String,
}

impl TextFragment {
    #[must_use]
    pub fn new(corners: [Point; 4], text: impl Into<String>) -> Self {
        Self {
            corners,
            text: text.into(),
        }
    }

    /// Builds a fragment from an axis-aligned rectangle.
    #[must_use]
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64, text: impl Into<String>) -> Self {
        Self::new(
            [
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
            text,
        )
    }

    /// Builds a fragment from a detector polygon. Four points are kept as
    /// they are; any other count is reduced to its bounding rectangle.
    /// Returns `None` for an empty polygon.
    #[must_use]
    pub fn from_polygon(points: &[Point], text: impl Into<String>) -> Option<Self> {
        if let Ok(corners) = <[Point; 4]>::try_from(points) {
            return Some(Self::new(corners, text));
        }
        let (min, max) = bounding_rect(points)?;
        Some(Self::from_rect(min.x, min.y, max.x - min.x, max.y - min.y, text))
    }

    /// Top-left and bottom-right corners of the axis-aligned box around the
    /// fragment.
    #[must_use]
    pub fn bounds(&self) -> (Point, Point) {
        bounding_rect(&self.corners).unwrap_or((self.corners[0], self.corners[2]))
    }

    /// Sort and cluster key: the first corner of the box.
    #[must_use]
    pub fn anchor(&self) -> Point {
        self.corners[0]
    }
}

fn bounding_rect(points: &[Point]) -> Option<(Point, Point)> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;
    for point in &points[1..] {
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
    }
    Some((min, max))
}

// Accepts both `{"box": [...], "text": "..."}` and the PaddleOCR line shape
// `[[[x, y] x4], ["text", score]]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFragment {
    Labeled {
        #[serde(rename = "box")]
        corners: Vec<Point>,
        text: String,
    },
    Paddle(Vec<Point>, (String, f64)),
}

impl TryFrom<RawFragment> for TextFragment {
    type Error = String;

    fn try_from(raw: RawFragment) -> Result<Self, Self::Error> {
        let (corners, text) = match raw {
            RawFragment::Labeled { corners, text } => (corners, text),
            RawFragment::Paddle(corners, (text, _score)) => (corners, text),
        };
        let count = corners.len();
        let corners: [Point; 4] = corners
            .try_into()
            .map_err(|_| format!("fragment box needs exactly 4 corners, got {count}"))?;
        Ok(Self { corners, text })
    }
}

/// Rectangular table of string cells. Row 0 is the header row by convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
    width: usize,
}

impl Grid {
    /// Pads ragged rows on the right with empty cells.
    ///
    /// # Errors
    /// Returns [`GridError::EmptyInput`] when `rows` is empty.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self, GridError> {
        if rows.is_empty() {
            return Err(GridError::EmptyInput);
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Ok(Self { rows, width })
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.rows[0]
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }
}
