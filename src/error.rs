use std::fmt::{Display, Formatter};

use sheetscan_grid::GridError;

#[derive(Debug)]
pub enum ConvertError {
    UnreadableInput(String),
    EmptyRecognition(String),
    Recognition(String),
    RemoteCall(String),
    InvalidConfig(String),
    HeaderRejected(String),
    Grid(GridError),
}

impl ConvertError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnreadableInput(_) => "unreadable_input",
            Self::EmptyRecognition(_) => "empty_recognition",
            Self::Recognition(_) => "recognition_error",
            Self::RemoteCall(_) => "remote_call_error",
            Self::InvalidConfig(_) => "invalid_config",
            Self::HeaderRejected(_) => "header_rejected",
            Self::Grid(_) => "grid_error",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::UnreadableInput(message)
            | Self::EmptyRecognition(message)
            | Self::Recognition(message)
            | Self::RemoteCall(message)
            | Self::InvalidConfig(message)
            | Self::HeaderRejected(message) => message.clone(),
            Self::Grid(error) => error.to_string(),
        }
    }
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Grid(error) => Some(error),
            _ => None,
        }
    }
}

impl From<GridError> for ConvertError {
    fn from(error: GridError) -> Self {
        match error {
            GridError::EmptyInput => {
                Self::EmptyRecognition("no text fragments were recognized".to_string())
            }
            GridError::InvalidOption(message) => Self::InvalidConfig(message),
            other => Self::Grid(other),
        }
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidConfig(error.to_string())
    }
}

impl From<url::ParseError> for ConvertError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidConfig(error.to_string())
    }
}

impl From<reqwest::Error> for ConvertError {
    fn from(error: reqwest::Error) -> Self {
        Self::RemoteCall(error.to_string())
    }
}

impl From<image::ImageError> for ConvertError {
    fn from(error: image::ImageError) -> Self {
        Self::UnreadableInput(error.to_string())
    }
}
