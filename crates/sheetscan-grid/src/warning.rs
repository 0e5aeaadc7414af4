#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    RowSplit,
    RowDrift,
    RaggedRows,
    NumericHeader,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterWarning {
    pub code: WarningCode,
    pub message: String,
    pub row: Option<usize>,
    pub distance: Option<f64>,
    pub confidence: Option<f32>,
}

impl ClusterWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            row: None,
            distance: None,
            confidence: None,
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
