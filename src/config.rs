//! Runtime configuration, assembled once per run and handed to each
//! component at construction.
//!
//! Sources in increasing precedence: built-in defaults, a JSON file
//! (`--config` or `SHEETSCAN_CONFIG`), `SHEETSCAN_*` environment variables,
//! then command-line flags applied by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sheetscan_grid::ClusterOptions;
use url::Url;

use crate::error::ConvertError;

pub const CONFIG_ENV: &str = "SHEETSCAN_CONFIG";
pub const API_URL_ENV: &str = "SHEETSCAN_API_URL";
pub const API_KEY_ENV: &str = "SHEETSCAN_API_KEY";
pub const MODEL_ENV: &str = "SHEETSCAN_MODEL";
pub const OUTPUT_DIR_ENV: &str = "SHEETSCAN_OUTPUT_DIR";
pub const TIMEOUT_ENV: &str = "SHEETSCAN_TIMEOUT_SECS";

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_MODEL: &str = "qwen-plus";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a data analyst who checks whether table column \
names make sense. Answer with a JSON object of the form {\"valid\": true or false, \"reason\": \
\"short explanation\"}. If a name does not conform to common sense, say so in the reason and \
suggest a correction.";
pub const DEFAULT_INVALID_MARKERS: [&str; 4] = ["does not conform", "problem", "不符合", "问题"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderCheckConfig {
    pub enabled: bool,
    /// Full chat-completions URL of an OpenAI-compatible service.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub timeout_secs: u64,
    /// Substrings that mark a free-text reply as a rejection.
    pub invalid_markers: Vec<String>,
}

impl Default for HeaderCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            invalid_markers: DEFAULT_INVALID_MARKERS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl HeaderCheckConfig {
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] when no endpoint is set or it
    /// is not an http(s) URL.
    pub fn endpoint_url(&self) -> Result<Url, ConvertError> {
        let raw = self.endpoint.as_deref().ok_or_else(|| {
            ConvertError::InvalidConfig(format!(
                "header check endpoint is not configured; set {API_URL_ENV} or header_check.endpoint"
            ))
        })?;
        let url = Url::parse(raw)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConvertError::InvalidConfig(format!(
                "header check endpoint must be http or https, got '{}'",
                url.scheme()
            )));
        }
        Ok(url)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language data, e.g. `eng` or `chi_sim+eng`.
    pub language: String,
    /// ONNX text detection model for the PaddleOCR pipeline.
    pub detection_model: Option<PathBuf>,
    /// ONNX text recognition model for the PaddleOCR pipeline.
    pub recognition_model: Option<PathBuf>,
    /// Character dictionary matching `recognition_model`.
    pub char_dict: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_OCR_LANGUAGE.to_string(),
            detection_model: None,
            recognition_model: None,
            char_dict: None,
        }
    }
}

/// Model files for the PaddleOCR detection + recognition pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddleModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
    pub char_dict: PathBuf,
}

impl OcrConfig {
    /// `None` when no model is configured.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] when only some of the three
    /// model paths are set.
    pub fn paddle_models(&self) -> Result<Option<PaddleModels>, ConvertError> {
        match (&self.detection_model, &self.recognition_model, &self.char_dict) {
            (None, None, None) => Ok(None),
            (Some(detection), Some(recognition), Some(char_dict)) => Ok(Some(PaddleModels {
                detection: detection.clone(),
                recognition: recognition.clone(),
                char_dict: char_dict.clone(),
            })),
            _ => Err(ConvertError::InvalidConfig(
                "ocr.detection_model, ocr.recognition_model and ocr.char_dict must be set together"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub cluster: ClusterOptions,
    pub header_check: HeaderCheckConfig,
    pub ocr: OcrConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            cluster: ClusterOptions::default(),
            header_check: HeaderCheckConfig::default(),
            ocr: OcrConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// See [`AppConfig::load_with`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConvertError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Loads defaults, then the config file, then variables from `lookup`.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] when the file cannot be read or
    /// parsed, or an environment value is malformed.
    pub fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConvertError> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let file = path
            .map(Path::to_path_buf)
            .or_else(|| lookup(CONFIG_ENV).map(PathBuf::from));
        let mut config = match file {
            Some(file) => Self::from_file(&file)?,
            None => Self::default(),
        };

        if let Some(endpoint) = lookup(API_URL_ENV) {
            config.header_check.endpoint = Some(endpoint);
        }
        if let Some(api_key) = lookup(API_KEY_ENV) {
            config.header_check.api_key = Some(api_key);
        }
        if let Some(model) = lookup(MODEL_ENV) {
            config.header_check.model = model;
        }
        if let Some(output_dir) = lookup(OUTPUT_DIR_ENV) {
            config.output_dir = PathBuf::from(output_dir);
        }
        if let Some(timeout) = lookup(TIMEOUT_ENV) {
            config.header_check.timeout_secs = timeout.trim().parse().map_err(|_| {
                ConvertError::InvalidConfig(format!("{TIMEOUT_ENV} must be whole seconds, got '{timeout}'"))
            })?;
        }

        Ok(config)
    }

    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] when the file is unreadable or
    /// not valid configuration JSON.
    pub fn from_file(path: &Path) -> Result<Self, ConvertError> {
        let data = std::fs::read_to_string(path).map_err(|error| {
            ConvertError::InvalidConfig(format!(
                "failed to read config '{}': {error}",
                path.display()
            ))
        })?;
        serde_json::from_str(&data).map_err(|error| {
            ConvertError::InvalidConfig(format!("invalid config '{}': {error}", path.display()))
        })
    }

    /// Checks settings that only matter once the pipeline is about to run.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] for an unusable endpoint, a
    /// zero timeout, a non-positive row threshold, or partial OCR model paths.
    pub fn validate(&self) -> Result<(), ConvertError> {
        self.ocr.paddle_models()?;
        if !self.cluster.threshold.is_finite() || self.cluster.threshold <= 0.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "cluster.threshold must be positive, got {}",
                self.cluster.threshold
            )));
        }
        if self.header_check.enabled {
            self.header_check.endpoint_url()?;
            if self.header_check.timeout_secs == 0 {
                return Err(ConvertError::InvalidConfig(
                    "header_check.timeout_secs must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}
