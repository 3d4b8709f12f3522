//! crash_monitor - per-frame collision monitor
//!
//! This binary:
//! 1. Loads configuration (CRASH_VISION_CONFIG file + environment overrides)
//! 2. Opens the capture source and the two scoring backends
//! 3. Runs every frame through the incident pipeline
//! 4. Hands each result to the log sink and, optionally, a JSON-lines file
//!
//! Without model files both backends run as scripted stubs, which together
//! with a `stub://` source exercise the whole pipeline offline.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crash_vision::config::{BackendKind, CrashVisionConfig};
use crash_vision::{
    open_source, ClassifierOutput, DetectionFilter, FrameResult, IncidentClassifier,
    IncidentGate, IncidentPipeline, JsonLinesSink, LogSink, ObjectDetector, RawCandidate,
    ResultSink, ScriptedClassifier, ScriptedDetector,
};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);
const MAX_CONSECUTIVE_CAPTURE_ERRORS: u32 = 10;
/// Frames between scripted incidents when running on stubs.
const STUB_INCIDENT_PERIOD: usize = 10;

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect vehicle collisions frame by frame")]
struct Args {
    /// Capture source: stub://<name>, an image directory, or a video path/URL.
    #[arg(long)]
    source: Option<String>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Append one JSON line per frame to this file.
    #[arg(long)]
    jsonl: Option<PathBuf>,

    /// Stop on the first model error instead of degrading the frame.
    #[arg(long)]
    abort_on_model_error: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = CrashVisionConfig::load()?;
    if let Some(source) = args.source {
        cfg.source.uri = source;
    }
    if args.jsonl.is_some() {
        cfg.jsonl_path = args.jsonl;
    }
    let abort_on_model_error = args.abort_on_model_error || cfg.abort_on_model_error;

    log::info!("crash_monitor {} starting", crash_vision::version());
    log::info!(
        "source={} accident_threshold={:.2} detection_threshold={:.2} nms={:.2} ({:?})",
        cfg.source.uri,
        cfg.gate.accident_confidence_threshold,
        cfg.filter.confidence_threshold,
        cfg.filter.nms_iou_threshold,
        cfg.filter.nms_mode
    );

    let labels = cfg.load_labels()?;
    let mut pipeline = IncidentPipeline::new(build_classifier(&cfg)?, build_detector(&cfg)?)
        .with_normalizer(cfg.build_normalizer())
        .with_gate(IncidentGate::new(cfg.gate.clone()))
        .with_filter(DetectionFilter::new(cfg.filter.clone()))
        .with_labels(labels);
    pipeline.warm_up()?;

    let mut sinks: Vec<Box<dyn ResultSink>> = vec![Box::new(LogSink)];
    if let Some(path) = &cfg.jsonl_path {
        sinks.push(Box::new(JsonLinesSink::create(path)?));
    }

    let mut source = open_source(&cfg.source)?;
    source.connect()?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .context("error setting Ctrl-C handler")?;

    let mut frame_index = 0u64;
    let mut capture_errors = 0u32;
    let mut last_health_log = Instant::now();

    loop {
        if shutdown_rx.try_recv().is_ok() {
            log::info!("shutdown signal received, stopping after frame {}", frame_index);
            break;
        }
        if args.max_frames.is_some_and(|max| frame_index >= max) {
            break;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => {
                capture_errors = 0;
                frame
            }
            Ok(None) => {
                log::info!("source ended");
                break;
            }
            Err(e) => {
                capture_errors += 1;
                log::warn!("capture failed ({}): {:#}", capture_errors, e);
                if capture_errors >= MAX_CONSECUTIVE_CAPTURE_ERRORS {
                    return Err(e.context("capture source keeps failing"));
                }
                continue;
            }
        };

        let result = match pipeline.process(&frame) {
            Ok(result) => result,
            Err(err) if err.is_invalid_frame() => {
                log::warn!("skipping frame {}: {}", frame_index, err);
                frame_index += 1;
                continue;
            }
            Err(err) if abort_on_model_error => {
                return Err(anyhow!(err).context(format!("frame {} failed", frame_index)));
            }
            Err(err) => {
                log::warn!("frame {} degraded: {}", frame_index, err);
                FrameResult::degraded()
            }
        };

        if result.incident_detected {
            log::info!(
                "incident at frame {}: severity={} confidence={:.2} vehicles={}",
                frame_index,
                result.severity,
                result.accident_confidence,
                result.detections.len()
            );
        }
        for sink in sinks.iter_mut() {
            sink.render(frame_index, &result)?;
        }
        frame_index += 1;

        if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let source_stats = source.stats();
            let stats = pipeline.stats();
            log::info!(
                "health source={} ok={} captured={} processed={} incidents={} detector_runs={} failed={}",
                source_stats.uri,
                source.is_healthy(),
                source_stats.frames_captured,
                stats.frames_processed,
                stats.incidents,
                stats.detector_runs,
                stats.frames_failed
            );
            last_health_log = Instant::now();
        }
    }

    for sink in sinks.iter_mut() {
        sink.flush()?;
    }
    let stats = pipeline.stats();
    log::info!(
        "done: {} frames, {} incidents, {} detector runs, {} failed",
        stats.frames_processed,
        stats.incidents,
        stats.detector_runs,
        stats.frames_failed
    );
    Ok(())
}

fn build_classifier(cfg: &CrashVisionConfig) -> Result<Box<dyn IncidentClassifier>> {
    match cfg.classifier.backend {
        BackendKind::Stub => Ok(Box::new(stub_classifier())),
        BackendKind::Tract => {
            #[cfg(feature = "backend-tract")]
            {
                let path = cfg
                    .classifier
                    .model_path
                    .as_ref()
                    .ok_or_else(|| anyhow!("classifier.model_path is not set"))?;
                Ok(Box::new(crash_vision::TractClassifier::new(
                    path,
                    cfg.classifier.input_width,
                    cfg.classifier.input_height,
                )?))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                Err(anyhow!(
                    "classifier backend 'tract' requires the backend-tract feature"
                ))
            }
        }
    }
}

fn build_detector(cfg: &CrashVisionConfig) -> Result<Box<dyn ObjectDetector>> {
    match cfg.detector.backend {
        BackendKind::Stub => Ok(Box::new(stub_detector())),
        BackendKind::Tract => {
            #[cfg(feature = "backend-tract")]
            {
                let path = cfg
                    .detector
                    .model_path
                    .as_ref()
                    .ok_or_else(|| anyhow!("detector.model_path is not set"))?;
                Ok(Box::new(crash_vision::TractDetector::new(
                    path,
                    cfg.detector.input_size,
                )?))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                Err(anyhow!(
                    "detector backend 'tract' requires the backend-tract feature"
                ))
            }
        }
    }
}

/// Quiet frames with a medium-severity incident every few frames.
fn stub_classifier() -> ScriptedClassifier {
    let quiet = ClassifierOutput::new(vec![0.9, 0.05, 0.03, 0.02], vec![0.9, 0.1]);
    let incident = ClassifierOutput::new(vec![0.1, 0.1, 0.7, 0.1], vec![0.15, 0.85]);
    let mut script = vec![quiet; STUB_INCIDENT_PERIOD - 1];
    script.push(incident);
    ScriptedClassifier::new(script)
}

/// A car over the synthetic vehicle plus a weaker overlapping truck box.
fn stub_detector() -> ScriptedDetector {
    ScriptedDetector::new(vec![
        RawCandidate::one_hot(0.5, 0.5, 0.25, 1.0 / 6.0, 2, 0.95, 80),
        RawCandidate::one_hot(0.51, 0.5, 0.25, 1.0 / 6.0, 7, 0.8, 80),
    ])
}
