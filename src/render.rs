//! Result sinks.
//!
//! Drawing is left to whoever consumes the results. The shipped sinks either
//! log the overlay text or append one JSON object per frame.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::result::FrameResult;

/// Consumer of per-frame results.
pub trait ResultSink {
    fn render(&mut self, frame_index: u64, result: &FrameResult) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn render(&mut self, frame_index: u64, result: &FrameResult) -> Result<()> {
        (**self).render(frame_index, result)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

// ----------------------------------------------------------------------------
// LogSink
// ----------------------------------------------------------------------------

/// Logs the overlay headline and captions. Quiet frames go to `debug`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn render(&mut self, frame_index: u64, result: &FrameResult) -> Result<()> {
        if !result.incident_detected {
            log::debug!("frame {}: {}", frame_index, result.headline());
            return Ok(());
        }

        let captions: Vec<String> = result.detections.iter().map(|d| d.caption()).collect();
        log::info!(
            "frame {}: {} vehicles=[{}]",
            frame_index,
            result.headline(),
            captions.join(", ")
        );
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// JsonLinesSink
// ----------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonLine<'a> {
    frame: u64,
    digest: String,
    #[serde(flatten)]
    result: &'a FrameResult,
}

/// Writes `{"frame": n, "digest": "...", ...result}` per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    lines: u64,
}

impl JsonLinesSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        log::info!("writing frame results to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonLinesSink<W> {
    fn render(&mut self, frame_index: u64, result: &FrameResult) -> Result<()> {
        let line = JsonLine {
            frame: frame_index,
            digest: result.digest(),
            result,
        };
        serde_json::to_writer(&mut self.writer, &line).context("serialize frame result")?;
        self.writer.write_all(b"\n").context("write frame result")?;
        self.lines += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("flush frame results")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{GateDecision, SeverityLevel};

    #[test]
    fn json_lines_carry_index_digest_and_result() {
        let result = FrameResult::no_incident(GateDecision {
            incident_detected: false,
            severity: SeverityLevel::Low,
            accident_confidence: 0.25,
        });
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.render(7, &result).unwrap();
        sink.render(8, &FrameResult::degraded()).unwrap();
        assert_eq!(sink.lines_written(), 2);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["frame"], 7);
        assert_eq!(first["severity"], 1);
        assert_eq!(first["incident_detected"], false);
        assert_eq!(first["digest"], result.digest());

        let back: FrameResult = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn log_sink_accepts_any_result() {
        let mut sink: Box<dyn ResultSink> = Box::new(LogSink);
        sink.render(0, &FrameResult::degraded()).unwrap();
        sink.flush().unwrap();
    }
}
