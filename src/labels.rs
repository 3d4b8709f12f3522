//! Detector class vocabulary.
//!
//! Loaded once at startup and read-only afterwards. The file format is the
//! usual `coco.names`: one class name per line, line number = class id.

use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// COCO class names (80 classes).
const COCO_CLASSES: &[&str] = &[
    "person",
    "bicycle",
    "car",
    "motorbike",
    "aeroplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "sofa",
    "pottedplant",
    "bed",
    "diningtable",
    "toilet",
    "tvmonitor",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelVocabulary {
    names: Vec<String>,
}

impl LabelVocabulary {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Built-in COCO vocabulary, as shipped with YOLOv3.
    pub fn coco() -> Self {
        Self::new(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    /// Parse newline-separated names. Surrounding blank lines are ignored,
    /// interior lines are kept so ids stay aligned.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("label vocabulary is empty"));
        }
        Ok(Self::new(
            trimmed.lines().map(|line| line.trim().to_string()).collect(),
        ))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label file {}", path.display()))?;
        let vocab = Self::parse(&text)
            .with_context(|| format!("invalid label file {}", path.display()))?;
        log::info!("loaded {} class labels from {}", vocab.len(), path.display());
        Ok(vocab)
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Name for `class_id`, or `class_<id>` when the vocabulary has no entry.
    pub fn resolve(&self, class_id: usize) -> String {
        self.get(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self::coco()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn coco_vehicle_ids() {
        let vocab = LabelVocabulary::coco();
        assert_eq!(vocab.len(), 80);
        assert_eq!(vocab.get(2), Some("car"));
        assert_eq!(vocab.get(7), Some("truck"));
    }

    #[test]
    fn parse_keeps_ids_aligned() {
        let vocab = LabelVocabulary::parse("\nperson\r\nbicycle\ncar\n\n").unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.get(2), Some("car"));
        assert!(LabelVocabulary::parse("  \n ").is_err());
    }

    #[test]
    fn unknown_ids_resolve_to_placeholder() {
        let vocab = LabelVocabulary::parse("a\nb").unwrap();
        assert_eq!(vocab.resolve(1), "b");
        assert_eq!(vocab.resolve(42), "class_42");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "person\nbicycle\ncar").unwrap();
        let vocab = LabelVocabulary::load(file.path()).unwrap();
        assert_eq!(vocab.resolve(2), "car");
        assert!(LabelVocabulary::load(Path::new("/nonexistent/coco.names")).is_err());
    }
}
