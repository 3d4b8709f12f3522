use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::{
    FilterConfig, NmsMode, DEFAULT_DETECTION_CONFIDENCE_THRESHOLD, DEFAULT_NMS_IOU_THRESHOLD,
    DEFAULT_VEHICLE_CLASSES,
};
use crate::frame::ChannelOrder;
use crate::gate::{GateConfig, DEFAULT_ACCIDENT_CONFIDENCE_THRESHOLD};
use crate::ingest::SourceConfig;
use crate::labels::LabelVocabulary;
use crate::preprocess::{
    FrameNormalizer, Interpolation, NormalizerConfig, PreprocessKind, DEFAULT_TARGET_SIZE,
};

const DEFAULT_SOURCE_URI: &str = "stub://road";
const DEFAULT_DETECTOR_INPUT_SIZE: u32 = 416;

#[derive(Debug, Deserialize, Default)]
struct CrashVisionConfigFile {
    source: Option<SourceConfigFile>,
    classifier: Option<ClassifierConfigFile>,
    detector: Option<DetectorConfigFile>,
    gate: Option<GateConfigFile>,
    filter: Option<FilterConfigFile>,
    labels_path: Option<PathBuf>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    uri: Option<String>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    backend: Option<BackendKind>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    preprocess: Option<PreprocessKind>,
    channel_order: Option<ChannelOrder>,
    interpolation: Option<Interpolation>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<BackendKind>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct GateConfigFile {
    accident_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct FilterConfigFile {
    confidence_threshold: Option<f32>,
    nms_threshold: Option<f32>,
    nms_mode: Option<NmsMode>,
    class_whitelist: Option<Vec<usize>>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    jsonl_path: Option<PathBuf>,
    abort_on_model_error: Option<bool>,
}

/// Which implementation backs a scoring model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Scripted outputs, no model file.
    #[default]
    Stub,
    /// ONNX model run with tract (feature: backend-tract).
    Tract,
}

#[derive(Debug, Clone)]
pub struct CrashVisionConfig {
    pub source: SourceConfig,
    pub classifier: ClassifierSettings,
    pub detector: DetectorSettings,
    pub gate: GateConfig,
    pub filter: FilterConfig,
    /// coco.names-style file; the built-in COCO list when unset.
    pub labels_path: Option<PathBuf>,
    pub jsonl_path: Option<PathBuf>,
    pub abort_on_model_error: bool,
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub backend: BackendKind,
    pub model_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
    pub preprocess: PreprocessKind,
    pub channel_order: ChannelOrder,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: BackendKind,
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
}

impl CrashVisionConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CRASH_VISION_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CrashVisionConfigFile) -> Self {
        let source_file = file.source.unwrap_or_default();
        let source = SourceConfig {
            uri: source_file
                .uri
                .unwrap_or_else(|| DEFAULT_SOURCE_URI.to_string()),
            seed: source_file.seed.unwrap_or(0),
        };

        let classifier_file = file.classifier.unwrap_or_default();
        let classifier = ClassifierSettings {
            backend: classifier_file.backend.unwrap_or_default(),
            model_path: classifier_file.model_path,
            input_width: classifier_file.input_width.unwrap_or(DEFAULT_TARGET_SIZE),
            input_height: classifier_file.input_height.unwrap_or(DEFAULT_TARGET_SIZE),
            preprocess: classifier_file.preprocess.unwrap_or_default(),
            channel_order: classifier_file.channel_order.unwrap_or(ChannelOrder::Rgb),
            interpolation: classifier_file.interpolation.unwrap_or_default(),
        };

        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file.backend.unwrap_or_default(),
            model_path: detector_file.model_path,
            input_size: detector_file
                .input_size
                .unwrap_or(DEFAULT_DETECTOR_INPUT_SIZE),
        };

        let gate = GateConfig {
            accident_confidence_threshold: file
                .gate
                .and_then(|gate| gate.accident_threshold)
                .unwrap_or(DEFAULT_ACCIDENT_CONFIDENCE_THRESHOLD),
        };

        let filter_file = file.filter.unwrap_or_default();
        let filter = FilterConfig {
            class_whitelist: filter_file
                .class_whitelist
                .unwrap_or_else(|| DEFAULT_VEHICLE_CLASSES.to_vec()),
            confidence_threshold: filter_file
                .confidence_threshold
                .unwrap_or(DEFAULT_DETECTION_CONFIDENCE_THRESHOLD),
            nms_iou_threshold: filter_file
                .nms_threshold
                .unwrap_or(DEFAULT_NMS_IOU_THRESHOLD),
            nms_mode: filter_file.nms_mode.unwrap_or_default(),
        };

        let output = file.output.unwrap_or_default();
        Self {
            source,
            classifier,
            detector,
            gate,
            filter,
            labels_path: file.labels_path,
            jsonl_path: output.jsonl_path,
            abort_on_model_error: output.abort_on_model_error.unwrap_or(false),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(uri) = std::env::var("CRASH_VISION_SOURCE") {
            if !uri.trim().is_empty() {
                self.source.uri = uri;
            }
        }
        if let Some(value) = env_f32("CRASH_VISION_ACCIDENT_THRESHOLD")? {
            self.gate.accident_confidence_threshold = value;
        }
        if let Some(value) = env_f32("CRASH_VISION_DETECTION_THRESHOLD")? {
            self.filter.confidence_threshold = value;
        }
        if let Some(value) = env_f32("CRASH_VISION_NMS_THRESHOLD")? {
            self.filter.nms_iou_threshold = value;
        }
        if let Ok(mode) = std::env::var("CRASH_VISION_NMS_MODE") {
            if !mode.trim().is_empty() {
                self.filter.nms_mode = mode
                    .parse()
                    .map_err(|e| anyhow!("CRASH_VISION_NMS_MODE: {}", e))?;
            }
        }
        if let Ok(path) = std::env::var("CRASH_VISION_LABELS") {
            if !path.trim().is_empty() {
                self.labels_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(classes) = std::env::var("CRASH_VISION_CLASS_WHITELIST") {
            let parsed = split_csv(&classes)
                .iter()
                .map(|entry| entry.parse::<usize>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| {
                    anyhow!("CRASH_VISION_CLASS_WHITELIST must be a comma-separated list of class ids")
                })?;
            if !parsed.is_empty() {
                self.filter.class_whitelist = parsed;
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        check_unit("gate.accident_threshold", self.gate.accident_confidence_threshold)?;
        check_unit("filter.confidence_threshold", self.filter.confidence_threshold)?;
        check_unit("filter.nms_threshold", self.filter.nms_iou_threshold)?;

        if self.filter.class_whitelist.is_empty() {
            return Err(anyhow!("filter.class_whitelist must not be empty"));
        }
        self.filter.class_whitelist.sort_unstable();
        self.filter.class_whitelist.dedup();

        if self.classifier.input_width == 0 || self.classifier.input_height == 0 {
            return Err(anyhow!("classifier input size must be greater than zero"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input size must be greater than zero"));
        }
        if self.source.uri.trim().is_empty() {
            return Err(anyhow!("source uri must not be empty"));
        }
        if self.classifier.backend == BackendKind::Tract && self.classifier.model_path.is_none() {
            return Err(anyhow!("classifier.model_path is required for the tract backend"));
        }
        if self.detector.backend == BackendKind::Tract && self.detector.model_path.is_none() {
            return Err(anyhow!("detector.model_path is required for the tract backend"));
        }
        Ok(())
    }

    pub fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig {
            target_width: self.classifier.input_width,
            target_height: self.classifier.input_height,
            interpolation: self.classifier.interpolation,
            target_order: self.classifier.channel_order,
        }
    }

    pub fn build_normalizer(&self) -> FrameNormalizer {
        FrameNormalizer::new(
            self.normalizer_config(),
            self.classifier.preprocess.into_strategy(),
        )
    }

    pub fn load_labels(&self) -> Result<LabelVocabulary> {
        match &self.labels_path {
            Some(path) => LabelVocabulary::load(path),
            None => Ok(LabelVocabulary::coco()),
        }
    }
}

fn read_config_file(path: &Path) -> Result<CrashVisionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_f32(name: &str) -> Result<Option<f32>> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a number", name)),
        _ => Ok(None),
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
