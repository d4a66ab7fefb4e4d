//! JSON configuration, pose documents and report output.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use swing_plane_core::validate::{read_index, read_number};
use swing_plane_core::{Frame, Handedness, PhaseBoundaries, PoseSnapshot};

use crate::params::AnalyzerParams;

#[derive(thiserror::Error, Debug)]
pub enum SwingIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("pose document has no `frames` array")]
    MissingFrames,
}

/// Configuration of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub pose_path: String,
    /// Recorded vision responses, replayed instead of a live model.
    #[serde(default)]
    pub vision_path: Option<String>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub handedness: Option<Handedness>,
    pub top_frame: u32,
    pub impact_frame: u32,
    #[serde(default)]
    pub params: Option<AnalyzerParams>,
}

impl AnalysisConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SwingIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SwingIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("swing_plane_report.json"))
    }

    pub fn phases(&self) -> PhaseBoundaries {
        PhaseBoundaries::new(self.top_frame, self.impact_frame)
    }

    pub fn build_params(&self) -> AnalyzerParams {
        self.params.clone().unwrap_or_default()
    }
}

/// Frames and poses read from a pose document, in frame order.
#[derive(Debug, Clone, Default)]
pub struct PoseSequence {
    pub frames: Vec<Frame>,
    pub poses: Vec<PoseSnapshot>,
    /// Optional per-frame image path, as written in the document.
    pub image_paths: Vec<Option<String>>,
}

impl PoseSequence {
    /// Parse `{"frames": [{"idx", "t", "pose", "image"}]}`.
    ///
    /// Entries without a usable `idx` take their 1-based position; negative or
    /// non-finite timestamps are dropped; a missing or malformed `pose` is an
    /// empty snapshot. Frames are sorted by index and duplicate indices keep
    /// the first entry.
    pub fn from_json(doc: &Value) -> Result<Self, SwingIoError> {
        let entries = doc
            .get("frames")
            .and_then(Value::as_array)
            .ok_or(SwingIoError::MissingFrames)?;
        let mut rows: Vec<(Frame, PoseSnapshot, Option<String>)> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let index = e
                    .get("idx")
                    .and_then(read_index)
                    .filter(|&i| i > 0)
                    .unwrap_or(i as u32 + 1);
                let t = e.get("t").and_then(read_number).filter(|t| *t >= 0.0);
                let pose = e.get("pose").map(PoseSnapshot::from_json).unwrap_or_default();
                let image = e.get("image").and_then(Value::as_str).map(str::to_owned);
                (Frame::new(index, t), pose, image)
            })
            .collect();
        rows.sort_by_key(|(f, _, _)| f.index);
        let before = rows.len();
        rows.dedup_by_key(|(f, _, _)| f.index);
        if rows.len() != before {
            warn!("dropped {} duplicate frame indices", before - rows.len());
        }
        let mut seq = PoseSequence::default();
        for (frame, pose, image) in rows {
            seq.frames.push(frame);
            seq.poses.push(pose);
            seq.image_paths.push(image);
        }
        Ok(seq)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SwingIoError> {
        let raw = fs::read_to_string(path)?;
        let doc: Value = serde_json::from_str(&raw)?;
        Self::from_json(&doc)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
