//! OCR collaborators. Each produces unordered text fragments for an image.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Deserialize;
use sheetscan_grid::TextFragment;
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::ConvertError;

/// Horizontal gap, as a share of the taller box, up to which neighbouring
/// words on one line are read as the same cell.
pub const WORD_GAP_RATIO: f64 = 0.8;

pub trait TextRecognizer {
    fn name(&self) -> &str;

    /// Recognizes `image`, decoded from `source`. Engines that read the file
    /// themselves use `source`; the others work on the decoded pixels.
    ///
    /// # Errors
    /// Returns [`ConvertError::Recognition`] when the engine fails. An image
    /// without text is not an error and yields an empty list.
    fn recognize(
        &self,
        source: &Path,
        image: &DynamicImage,
    ) -> Result<Vec<TextFragment>, ConvertError>;
}

/// Decodes an image file.
///
/// # Errors
/// Returns [`ConvertError::UnreadableInput`] when the file is missing or is
/// not a supported image.
pub fn load_image(path: &Path) -> Result<DynamicImage, ConvertError> {
    image::open(path).map_err(|error| {
        ConvertError::UnreadableInput(format!(
            "cannot decode image '{}': {error}",
            path.display()
        ))
    })
}

// A flat fragment list, or PaddleOCR's per-page output where a page with no
// text is `null`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FragmentFile {
    Flat(Vec<TextFragment>),
    Pages(Vec<Option<Vec<TextFragment>>>),
}

/// Replays fragments recognized ahead of time and stored as JSON.
#[derive(Debug, Clone)]
pub struct FragmentFileRecognizer {
    path: PathBuf,
}

impl FragmentFileRecognizer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// # Errors
    /// Returns [`ConvertError::Recognition`] when the file cannot be read or
    /// does not hold fragments.
    pub fn load(&self) -> Result<Vec<TextFragment>, ConvertError> {
        let data = std::fs::read_to_string(&self.path).map_err(|error| {
            ConvertError::Recognition(format!(
                "failed to read fragments '{}': {error}",
                self.path.display()
            ))
        })?;
        let file: FragmentFile = serde_json::from_str(&data).map_err(|error| {
            ConvertError::Recognition(format!(
                "invalid fragments file '{}': {error}",
                self.path.display()
            ))
        })?;

        Ok(match file {
            FragmentFile::Flat(fragments) => fragments,
            FragmentFile::Pages(pages) => pages.into_iter().flatten().flatten().collect(),
        })
    }
}

impl TextRecognizer for FragmentFileRecognizer {
    fn name(&self) -> &str {
        "fragment-file"
    }

    fn recognize(
        &self,
        _source: &Path,
        image: &DynamicImage,
    ) -> Result<Vec<TextFragment>, ConvertError> {
        let fragments = self.load()?;
        debug!(
            width = image.width(),
            height = image.height(),
            fragments = fragments.len(),
            "loaded pre-recognized fragments"
        );
        Ok(fragments)
    }
}

/// Joins words that sit next to each other on one text line into a single
/// fragment covering their union box, so a multi-word cell stays one cell.
/// Input order is kept; only consecutive words are joined.
#[must_use]
pub fn merge_line_words(words: Vec<TextFragment>) -> Vec<TextFragment> {
    let mut phrases: Vec<TextFragment> = Vec::with_capacity(words.len());
    for word in words {
        let joins = phrases
            .last()
            .is_some_and(|phrase| continues_phrase(phrase, &word));
        match phrases.last_mut() {
            Some(phrase) if joins => *phrase = join_words(phrase, &word),
            _ => phrases.push(word),
        }
    }
    phrases
}

fn continues_phrase(phrase: &TextFragment, word: &TextFragment) -> bool {
    let (phrase_min, phrase_max) = phrase.bounds();
    let (word_min, word_max) = word.bounds();
    let phrase_height = phrase_max.y - phrase_min.y;
    let word_height = word_max.y - word_min.y;

    let overlap = phrase_max.y.min(word_max.y) - phrase_min.y.max(word_min.y);
    let gap = word_min.x - phrase_max.x;
    let taller = phrase_height.max(word_height);

    overlap >= phrase_height.min(word_height) / 2.0
        && gap >= -taller / 2.0
        && gap <= taller * WORD_GAP_RATIO
}

fn join_words(phrase: &TextFragment, word: &TextFragment) -> TextFragment {
    let (phrase_min, phrase_max) = phrase.bounds();
    let (word_min, word_max) = word.bounds();
    let left = phrase_min.x.min(word_min.x);
    let top = phrase_min.y.min(word_min.y);
    let right = phrase_max.x.max(word_max.x);
    let bottom = phrase_max.y.max(word_max.y);
    TextFragment::from_rect(
        left,
        top,
        right - left,
        bottom - top,
        format!("{} {}", phrase.text, word.text),
    )
}

#[cfg(feature = "paddle")]
pub use paddle::PaddleRecognizer;

#[cfg(feature = "paddle")]
mod paddle {
    use std::cell::RefCell;
    use std::path::Path;

    use image::DynamicImage;
    use oar_ocr::pipeline::{OAROCR, OAROCRBuilder};
    use sheetscan_grid::{Point, TextFragment};
    use tracing::debug;

    use super::TextRecognizer;
    use crate::config::PaddleModels;
    use crate::error::ConvertError;

    /// Line-level detection and recognition with PaddleOCR models run
    /// through ONNX Runtime.
    pub struct PaddleRecognizer {
        pipeline: RefCell<OAROCR>,
    }

    impl PaddleRecognizer {
        /// # Errors
        /// Returns [`ConvertError::Recognition`] when a model or the
        /// dictionary cannot be loaded.
        pub fn new(models: &PaddleModels) -> Result<Self, ConvertError> {
            let pipeline = OAROCRBuilder::new(
                models.detection.to_string_lossy().into_owned(),
                models.recognition.to_string_lossy().into_owned(),
                models.char_dict.to_string_lossy().into_owned(),
            )
            .text_detection_batch_size(1)
            .text_recognition_batch_size(1)
            .text_rec_score_thresh(0.0)
            .build()
            .map_err(|error| {
                ConvertError::Recognition(format!("failed to load PaddleOCR models: {error}"))
            })?;
            Ok(Self {
                pipeline: RefCell::new(pipeline),
            })
        }
    }

    impl TextRecognizer for PaddleRecognizer {
        fn name(&self) -> &str {
            "paddle"
        }

        fn recognize(
            &self,
            source: &Path,
            _image: &DynamicImage,
        ) -> Result<Vec<TextFragment>, ConvertError> {
            let result = self.pipeline.borrow_mut().predict(source).map_err(|error| {
                ConvertError::Recognition(format!(
                    "PaddleOCR failed on '{}': {error}",
                    source.display()
                ))
            })?;

            let mut fragments = Vec::new();
            for (text_box, text) in result.text_boxes.iter().zip(&result.rec_texts) {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let points: Vec<Point> = text_box
                    .points
                    .iter()
                    .map(|point| Point::new(f64::from(point.x), f64::from(point.y)))
                    .collect();
                if let Some(fragment) = TextFragment::from_polygon(&points, text) {
                    fragments.push(fragment);
                }
            }

            debug!(
                boxes = result.text_boxes.len(),
                fragments = fragments.len(),
                "paddle recognition finished"
            );
            Ok(fragments)
        }
    }
}

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractRecognizer;

#[cfg(feature = "tesseract")]
mod tesseract {
    use std::io::Cursor;
    use std::path::Path;

    use image::{DynamicImage, ImageFormat};
    use leptess::LepTess;
    use sheetscan_grid::TextFragment;
    use tracing::debug;

    use super::{TextRecognizer, merge_line_words};
    use crate::error::ConvertError;

    /// Recognition through the system Tesseract library. Word boxes on one
    /// line are joined into cell-sized fragments.
    pub struct TesseractRecognizer {
        language: String,
    }

    impl TesseractRecognizer {
        /// # Errors
        /// Returns [`ConvertError::Recognition`] when Tesseract cannot load
        /// the language data.
        pub fn new(language: &str) -> Result<Self, ConvertError> {
            LepTess::new(None, language).map_err(|error| {
                ConvertError::Recognition(format!(
                    "failed to initialize Tesseract with language '{language}': {error}"
                ))
            })?;
            Ok(Self {
                language: language.to_string(),
            })
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn name(&self) -> &str {
            "tesseract"
        }

        fn recognize(
            &self,
            _source: &Path,
            image: &DynamicImage,
        ) -> Result<Vec<TextFragment>, ConvertError> {
            let mut lt = LepTess::new(None, &self.language).map_err(|error| {
                ConvertError::Recognition(format!("failed to initialize Tesseract: {error}"))
            })?;

            let mut png = Cursor::new(Vec::new());
            image.write_to(&mut png, ImageFormat::Png).map_err(|error| {
                ConvertError::Recognition(format!("failed to encode image for Tesseract: {error}"))
            })?;
            lt.set_image_from_mem(png.get_ref()).map_err(|error| {
                ConvertError::Recognition(format!("failed to load image into Tesseract: {error}"))
            })?;

            // None means the page has no text.
            let Some(boxes) =
                lt.get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_WORD, true)
            else {
                return Ok(Vec::new());
            };

            let mut words = Vec::new();
            for bbox in &boxes {
                let geom = bbox.get_geometry();
                lt.set_rectangle(geom.x, geom.y, geom.w, geom.h);
                let text = lt.get_utf8_text().unwrap_or_default().trim().to_string();
                if text.is_empty() {
                    continue;
                }
                words.push(TextFragment::from_rect(
                    f64::from(geom.x),
                    f64::from(geom.y),
                    f64::from(geom.w),
                    f64::from(geom.h),
                    text,
                ));
            }

            let word_count = words.len();
            let fragments = merge_line_words(words);
            debug!(
                words = word_count,
                fragments = fragments.len(),
                "tesseract recognition finished"
            );
            Ok(fragments)
        }
    }
}

/// Picks the recognizer for this run, in order: a fragments file when given,
/// the PaddleOCR pipeline when built in and its models are configured, then
/// Tesseract when built in.
///
/// # Errors
/// Returns [`ConvertError::InvalidConfig`] when none of them is available,
/// or [`ConvertError::Recognition`] when the chosen engine fails to load.
pub fn recognizer_for(
    ocr: &OcrConfig,
    fragments: Option<&Path>,
) -> Result<Box<dyn TextRecognizer>, ConvertError> {
    if let Some(path) = fragments {
        return Ok(Box::new(FragmentFileRecognizer::new(path)));
    }

    #[cfg(feature = "paddle")]
    {
        if let Some(models) = ocr.paddle_models()? {
            return Ok(Box::new(PaddleRecognizer::new(&models)?));
        }
    }

    #[cfg(feature = "tesseract")]
    {
        Ok(Box::new(TesseractRecognizer::new(&ocr.language)?))
    }

    #[cfg(not(feature = "tesseract"))]
    {
        let _ = ocr;
        Err(ConvertError::InvalidConfig(
            "no OCR engine is available; pass --fragments <json>, or build with \
             --features paddle (and set the ocr model paths) or --features tesseract"
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use image::DynamicImage;
    use pretty_assertions::assert_eq;
    use sheetscan_grid::TextFragment;
    use tempfile::tempdir;

    use super::{
        FragmentFileRecognizer, TextRecognizer, load_image, merge_line_words, recognizer_for,
    };
    use crate::config::OcrConfig;

    fn texts(fragments: &[TextFragment]) -> Vec<&str> {
        fragments.iter().map(|fragment| fragment.text.as_str()).collect()
    }

    #[test]
    fn reads_flat_fragment_list() {
        let dir = tempdir().expect("tempdir should be created");
        let path = dir.path().join("fragments.json");
        std::fs::write(
            &path,
            r#"[{"box": [[0, 0], [10, 0], [10, 5], [0, 5]], "text": "name"},
                {"box": [[20, 1], [30, 1], [30, 6], [20, 6]], "text": "age"}]"#,
        )
        .expect("fixture should be written");

        let fragments = FragmentFileRecognizer::new(&path)
            .recognize(Path::new("table.png"), &DynamicImage::new_rgb8(4, 4))
            .expect("fragments should load");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].text, "age");
    }

    #[test]
    fn reads_paddle_pages_and_skips_empty_pages() {
        let dir = tempdir().expect("tempdir should be created");
        let path = dir.path().join("paddle.json");
        std::fs::write(
            &path,
            r#"[[[[[5, 5], [40, 5], [40, 20], [5, 20]], ["姓名", 0.99]],
                 [[[60, 6], [90, 6], [90, 20], [60, 20]], ["年龄", 0.98]]],
                null]"#,
        )
        .expect("fixture should be written");

        let fragments = FragmentFileRecognizer::new(&path)
            .load()
            .expect("paddle output should load");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "姓名");
    }

    #[test]
    fn invalid_fragment_file_is_a_recognition_error() {
        let dir = tempdir().expect("tempdir should be created");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"text": "x"}"#).expect("fixture should be written");

        let err = FragmentFileRecognizer::new(&path)
            .load()
            .expect_err("object should not parse");
        assert_eq!(err.code(), "recognition_error");
    }

    #[test]
    fn words_on_one_line_join_into_cells() {
        // "first name" and "pay grade" are two-word cells 60px apart.
        let words = vec![
            TextFragment::from_rect(10.0, 10.0, 30.0, 14.0, "first"),
            TextFragment::from_rect(44.0, 11.0, 28.0, 14.0, "name"),
            TextFragment::from_rect(140.0, 10.0, 20.0, 14.0, "age"),
            TextFragment::from_rect(220.0, 10.0, 18.0, 14.0, "pay"),
            TextFragment::from_rect(242.0, 9.0, 36.0, 15.0, "grade"),
            TextFragment::from_rect(10.0, 50.0, 30.0, 14.0, "ann"),
            TextFragment::from_rect(44.0, 50.0, 24.0, 14.0, "lee"),
        ];

        let fragments = merge_line_words(words);
        assert_eq!(
            texts(&fragments),
            vec!["first name", "age", "pay grade", "ann lee"]
        );
        assert_eq!(
            fragments[0],
            TextFragment::from_rect(10.0, 10.0, 62.0, 15.0, "first name")
        );
        assert_eq!(
            fragments[2],
            TextFragment::from_rect(220.0, 9.0, 58.0, 15.0, "pay grade")
        );
    }

    #[test]
    fn words_on_different_lines_stay_apart() {
        // Horizontally adjacent, but the second word sits a full line lower.
        let words = vec![
            TextFragment::from_rect(10.0, 10.0, 30.0, 14.0, "total"),
            TextFragment::from_rect(42.0, 30.0, 30.0, 14.0, "30"),
        ];

        assert_eq!(texts(&merge_line_words(words)), vec!["total", "30"]);
        assert!(merge_line_words(Vec::new()).is_empty());
    }

    #[test]
    fn fragments_file_takes_precedence_over_engines() {
        let recognizer = recognizer_for(&OcrConfig::default(), Some(Path::new("fragments.json")))
            .expect("fragments file is always available");
        assert_eq!(recognizer.name(), "fragment-file");
    }

    #[cfg(not(any(feature = "paddle", feature = "tesseract")))]
    #[test]
    fn no_engine_without_fragments_is_a_config_error() {
        let err = recognizer_for(&OcrConfig::default(), None)
            .err()
            .expect("no engine is built in");
        assert_eq!(err.code(), "invalid_config");
        assert!(err.message().contains("--fragments"), "{}", err.message());
    }

    #[test]
    fn undecodable_image_is_unreadable_input() {
        let dir = tempdir().expect("tempdir should be created");
        let path = dir.path().join("not-an-image.png");
        std::fs::write(&path, b"plain text").expect("fixture should be written");

        let err = load_image(&path).expect_err("text is not an image");
        assert_eq!(err.code(), "unreadable_input");
    }
}
