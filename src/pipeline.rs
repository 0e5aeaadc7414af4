use std::path::{Path, PathBuf};

use sheetscan_grid::{ClusterOptions, ClusterWarning, cluster_fragments, write_grid};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::ConvertError;
use crate::header_check::{ChatCompletion, HeaderChecker, HttpChatClient};
use crate::models::HeaderVerdict;
use crate::ocr::{TextRecognizer, load_image, recognizer_for};

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub output_path: PathBuf,
    pub fragment_count: usize,
    pub row_count: usize,
    pub column_count: usize,
    /// `None` when the header check was disabled.
    pub verdict: Option<HeaderVerdict>,
    pub warnings: Vec<ClusterWarning>,
}

/// Runs one image through recognition, clustering, the optional header
/// check, and the grid writer.
pub struct Converter<C = HttpChatClient> {
    recognizer: Box<dyn TextRecognizer>,
    checker: Option<HeaderChecker<C>>,
    cluster: ClusterOptions,
    output_dir: PathBuf,
}

impl<C: ChatCompletion> Converter<C> {
    pub fn new(
        recognizer: Box<dyn TextRecognizer>,
        checker: Option<HeaderChecker<C>>,
        config: &AppConfig,
    ) -> Self {
        Self {
            recognizer,
            checker,
            cluster: config.cluster,
            output_dir: config.output_dir.clone(),
        }
    }

    /// Converts `image_path` and writes the grid to the output directory under
    /// the file name of `output_filename`.
    ///
    /// # Errors
    /// - [`ConvertError::UnreadableInput`] when the image cannot be decoded.
    /// - [`ConvertError::EmptyRecognition`] when no text is found.
    /// - [`ConvertError::HeaderRejected`] when the header check fails. Nothing
    ///   is written in that case.
    /// - Recognition, configuration, or write failures from the collaborators.
    pub fn convert(
        &self,
        image_path: &Path,
        output_filename: &Path,
    ) -> Result<ConversionReport, ConvertError> {
        let image = load_image(image_path)?;
        debug!(
            path = %image_path.display(),
            width = image.width(),
            height = image.height(),
            "image decoded"
        );

        let fragments = self.recognizer.recognize(image_path, &image)?;
        if fragments.is_empty() {
            return Err(ConvertError::EmptyRecognition(format!(
                "no text recognized in '{}'",
                image_path.display()
            )));
        }
        info!(
            recognizer = self.recognizer.name(),
            fragments = fragments.len(),
            "text recognized"
        );

        let report = cluster_fragments(&fragments, &self.cluster)?;
        for warning in &report.warnings {
            debug!(code = ?warning.code, row = ?warning.row, "{}", warning.message);
        }
        info!(
            rows = report.grid.height(),
            columns = report.grid.width(),
            "fragments clustered"
        );

        let verdict = match &self.checker {
            Some(checker) => {
                let verdict = checker.check(report.grid.header());
                if !verdict.valid {
                    warn!(message = %verdict.message, "header rejected; nothing written");
                    return Err(ConvertError::HeaderRejected(verdict.message));
                }
                Some(verdict)
            }
            None => None,
        };

        let output_path = write_grid(&report.grid, &self.output_dir, output_filename)?;
        Ok(ConversionReport {
            output_path,
            fragment_count: fragments.len(),
            row_count: report.grid.height(),
            column_count: report.grid.width(),
            verdict,
            warnings: report.warnings,
        })
    }
}

/// Builds the converter the binary runs: recognizer from `fragments` or the
/// compiled-in engine, and an HTTP header check unless disabled.
///
/// # Errors
/// Returns [`ConvertError::InvalidConfig`] when the configuration does not
/// validate or no recognizer is available.
pub fn build_converter(
    config: &AppConfig,
    fragments: Option<&Path>,
) -> Result<Converter<HttpChatClient>, ConvertError> {
    config.validate()?;
    let recognizer = recognizer_for(&config.ocr, fragments)?;
    let checker = if config.header_check.enabled {
        let client = HttpChatClient::new(&config.header_check)?;
        Some(HeaderChecker::new(client, &config.header_check))
    } else {
        None
    };
    Ok(Converter::new(recognizer, checker, config))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use image::{DynamicImage, RgbImage};
    use sheetscan_grid::TextFragment;
    use tempfile::{TempDir, tempdir};

    use super::Converter;
    use crate::config::AppConfig;
    use crate::error::ConvertError;
    use crate::header_check::{ChatCompletion, HeaderChecker};
    use crate::ocr::TextRecognizer;

    struct FixedFragments(Vec<TextFragment>);

    impl TextRecognizer for FixedFragments {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(
            &self,
            _source: &Path,
            _image: &DynamicImage,
        ) -> Result<Vec<TextFragment>, ConvertError> {
            Ok(self.0.clone())
        }
    }

    struct Reply(&'static str);

    impl ChatCompletion for Reply {
        fn complete(&self, _system: &str, _user: &str) -> Result<String, ConvertError> {
            Ok(self.0.to_string())
        }
    }

    fn scratch() -> (TempDir, AppConfig, std::path::PathBuf) {
        let dir = tempdir().expect("tempdir should be created");
        let image = dir.path().join("table.png");
        DynamicImage::ImageRgb8(RgbImage::new(8, 8))
            .save(&image)
            .expect("image should be written");
        let config = AppConfig {
            output_dir: dir.path().join("out"),
            ..AppConfig::default()
        };
        (dir, config, image)
    }

    fn header_fragments() -> Vec<TextFragment> {
        vec![
            TextFragment::from_rect(100.0, 10.0, 40.0, 12.0, "age"),
            TextFragment::from_rect(10.0, 10.0, 40.0, 12.0, "name"),
            TextFragment::from_rect(10.0, 40.0, 40.0, 12.0, "ann"),
            TextFragment::from_rect(100.0, 41.0, 40.0, 12.0, "30"),
        ]
    }

    fn converter(
        fragments: Vec<TextFragment>,
        reply: &'static str,
        config: &AppConfig,
    ) -> Converter<Reply> {
        Converter::new(
            Box::new(FixedFragments(fragments)),
            Some(HeaderChecker::new(Reply(reply), &config.header_check)),
            config,
        )
    }

    #[test]
    fn rejected_header_writes_nothing() {
        let (_dir, config, image) = scratch();
        let converter = converter(
            header_fragments(),
            "The column names do not look right: 'age' does not conform.",
            &config,
        );

        let err = converter
            .convert(&image, Path::new("result.xlsx"))
            .expect_err("header should be rejected");
        assert_eq!(err.code(), "header_rejected");
        assert!(!config.output_dir.join("result.xlsx").exists());
    }

    #[test]
    fn accepted_header_writes_grid() {
        let (_dir, config, image) = scratch();
        let converter = converter(
            header_fragments(),
            r#"{"valid": true, "reason": "names are fine"}"#,
            &config,
        );

        let report = converter
            .convert(&image, Path::new("nested/result.csv"))
            .expect("conversion should succeed");
        assert_eq!(report.output_path, config.output_dir.join("result.csv"));
        assert_eq!((report.row_count, report.column_count), (2, 2));
        assert_eq!(
            report.verdict.map(|verdict| verdict.message),
            Some("names are fine".to_string())
        );

        let written =
            std::fs::read_to_string(&report.output_path).expect("csv should be readable");
        assert_eq!(written, "name,age\nann,30\n");
    }

    #[test]
    fn no_fragments_is_empty_recognition() {
        let (_dir, config, image) = scratch();
        let converter = converter(Vec::new(), "{\"valid\": true}", &config);

        let err = converter
            .convert(&image, Path::new("result.xlsx"))
            .expect_err("nothing recognized");
        assert_eq!(err.code(), "empty_recognition");
    }

    #[test]
    fn missing_image_is_unreadable_input() {
        let (dir, config, _image) = scratch();
        let converter = converter(header_fragments(), "{\"valid\": true}", &config);

        let err = converter
            .convert(&dir.path().join("missing.png"), Path::new("result.xlsx"))
            .expect_err("image is missing");
        assert_eq!(err.code(), "unreadable_input");
    }
}
