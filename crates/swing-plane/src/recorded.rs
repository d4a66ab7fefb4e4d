//! Replay of recorded vision-model answers.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use swing_plane_core::{Frame, VisionError, VisionPrompt, VisionQuery};

use crate::io::SwingIoError;

/// Vision answers keyed by prompt kind and frame index.
///
/// On disk: `{"grip": {"12": {...}}, "address": {"1": {...}}, "clubhead_roi": {...}}`.
/// A frame without a recorded answer replays as "no data".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedVision {
    #[serde(default)]
    pub grip: BTreeMap<u32, Value>,
    #[serde(default)]
    pub address: BTreeMap<u32, Value>,
    #[serde(default)]
    pub clubhead_roi: BTreeMap<u32, Value>,
}

impl RecordedVision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: Value) -> Result<Self, SwingIoError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SwingIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Record an answer for `prompt` on frame `index`.
    pub fn with(mut self, prompt: VisionPrompt, index: u32, answer: Value) -> Self {
        self.answers_mut(prompt).insert(index, answer);
        self
    }

    fn answers(&self, prompt: VisionPrompt) -> &BTreeMap<u32, Value> {
        match prompt {
            VisionPrompt::Grip => &self.grip,
            VisionPrompt::Address => &self.address,
            VisionPrompt::ClubheadRoi => &self.clubhead_roi,
        }
    }

    fn answers_mut(&mut self, prompt: VisionPrompt) -> &mut BTreeMap<u32, Value> {
        match prompt {
            VisionPrompt::Grip => &mut self.grip,
            VisionPrompt::Address => &mut self.address,
            VisionPrompt::ClubheadRoi => &mut self.clubhead_roi,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.grip.is_empty() && self.address.is_empty() && self.clubhead_roi.is_empty()
    }
}

impl VisionQuery for RecordedVision {
    fn query(&self, frames: &[Frame], prompt: &str) -> Result<Option<Value>, VisionError> {
        let kind = VisionPrompt::from_prompt(prompt)
            .ok_or_else(|| VisionError::Unavailable(format!("no recording for prompt {prompt:?}")))?;
        let Some(frame) = frames.first() else {
            return Ok(None);
        };
        let answer = self.answers(kind).get(&frame.index).cloned();
        if answer.is_none() {
            debug!("no recorded {} answer for frame {}", kind.key(), frame.index);
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replays_by_prompt_and_frame() {
        let rec = RecordedVision::from_json(json!({
            "grip": {"3": {"x": 0.4, "y": 0.5}},
            "address": {"1": {"ball": [70, 90]}}
        }))
        .expect("recording");
        let f3 = [Frame::new(3, None)];
        let got = rec
            .query(&f3, VisionPrompt::Grip.text())
            .expect("grip query");
        assert_eq!(got, Some(json!({"x": 0.4, "y": 0.5})));
        assert_eq!(rec.query(&f3, VisionPrompt::Address.text()), Ok(None));
        assert_eq!(rec.query(&[], VisionPrompt::Grip.text()), Ok(None));
        assert!(rec.query(&f3, "describe the swing").is_err());
    }

    #[test]
    fn builder_and_json_agree() {
        let rec = RecordedVision::new().with(VisionPrompt::ClubheadRoi, 2, json!({"clubhead": null}));
        let back: RecordedVision =
            serde_json::from_str(&serde_json::to_string(&rec).expect("ser")).expect("de");
        assert_eq!(back, rec);
        assert!(!back.is_empty());
    }
}
