//! Interfaces to the capabilities the engine consumes but does not implement:
//! the vision-model query and image cropping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;

use crate::types::{Frame, NormRect};

/// Failure of the external vision capability.
///
/// None of these are fatal to an analysis: callers log them and carry on as if
/// the query had returned no data.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VisionError {
    #[error("vision query timed out after {ms} ms")]
    Timeout { ms: u64 },
    #[error("vision service unavailable: {0}")]
    Unavailable(String),
    #[error("vision query cancelled")]
    Cancelled,
}

/// The questions the engine asks the vision model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisionPrompt {
    /// Grip (both hands on the club) position in a single frame.
    Grip,
    /// Clubhead, grip, ball and shoulder in an address frame.
    Address,
    /// Clubhead inside a crop around the expected clubhead area.
    ClubheadRoi,
}

impl VisionPrompt {
    pub const ALL: [VisionPrompt; 3] = [
        VisionPrompt::Grip,
        VisionPrompt::Address,
        VisionPrompt::ClubheadRoi,
    ];

    /// Short stable key, used by recorded-response fixtures.
    pub fn key(self) -> &'static str {
        match self {
            VisionPrompt::Grip => "grip",
            VisionPrompt::Address => "address",
            VisionPrompt::ClubheadRoi => "clubhead_roi",
        }
    }

    /// Prompt text sent to the model.
    pub fn text(self) -> &'static str {
        match self {
            VisionPrompt::Grip => {
                "Locate the golfer's grip (where both hands hold the club). \
                 Reply with JSON {\"grip\": {\"x\": number, \"y\": number}} in normalized \
                 image coordinates, or {\"grip\": null} if not visible."
            }
            VisionPrompt::Address => {
                "This is the address position of a golf swing. Reply with JSON \
                 {\"clubhead\", \"grip\", \"ball\", \"shoulder\"}, each {\"x\", \"y\", \
                 \"confidence\": \"high\"|\"medium\"|\"low\"} in normalized image \
                 coordinates, or null when not visible."
            }
            VisionPrompt::ClubheadRoi => {
                "This crop shows the area around a golf ball at address. Reply with JSON \
                 {\"clubhead\": {\"x\", \"y\", \"confidence\"}, \"ball_side\": {\"x\", \"y\"}} \
                 in coordinates normalized to the crop, or null when not visible."
            }
        }
    }

    /// Inverse of [`VisionPrompt::text`] (exact match) or [`VisionPrompt::key`].
    pub fn from_prompt(prompt: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.text() == prompt || p.key() == prompt)
    }
}

/// Opaque vision-model capability.
///
/// Results are untyped JSON that may be partial or malformed; the engine
/// validates every field it reads.
pub trait VisionQuery {
    fn query(&self, frames: &[Frame], prompt: &str) -> Result<Option<Value>, VisionError>;
}

impl<T: VisionQuery + ?Sized> VisionQuery for &T {
    fn query(&self, frames: &[Frame], prompt: &str) -> Result<Option<Value>, VisionError> {
        (**self).query(frames, prompt)
    }
}

/// Cooperative cancellation shared between a request handler and the engine.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run a vision query, folding every failure into `None`.
///
/// Cancellation skips the call entirely; errors are logged and treated as
/// "no data for this call".
pub fn query_or_none<V: VisionQuery + ?Sized>(
    vision: Option<&V>,
    frames: &[Frame],
    prompt: VisionPrompt,
    cancel: Option<&CancelFlag>,
) -> Option<Value> {
    let vision = vision?;
    if cancel.is_some_and(CancelFlag::is_cancelled) {
        debug!("skipping {} query: analysis cancelled", prompt.key());
        return None;
    }
    match vision.query(frames, prompt.text()) {
        Ok(v) => v.filter(|v| !v.is_null()),
        Err(err) => {
            let first = frames.first().map(|f| f.index).unwrap_or(0);
            warn!("{} query for frame {first} failed: {err}", prompt.key());
            None
        }
    }
}

/// Opaque image-cropping capability.
pub trait ImageCrop {
    /// Crop `frame` to `roi` (normalized). The result keeps the frame index and
    /// timestamp; `None` when the frame has no pixels or the ROI is empty.
    fn crop(&self, frame: &Frame, roi: &NormRect) -> Option<Frame>;
}

/// In-memory cropper for frames carrying a [`crate::GrayImage`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GrayCropper;

impl ImageCrop for GrayCropper {
    fn crop(&self, frame: &Frame, roi: &NormRect) -> Option<Frame> {
        let image = frame.image.as_ref()?.crop_normalized(roi)?;
        Some(Frame {
            index: frame.index,
            timestamp_sec: frame.timestamp_sec,
            image: Some(image),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrayImage;
    use serde_json::json;

    struct Failing;

    impl VisionQuery for Failing {
        fn query(&self, _: &[Frame], _: &str) -> Result<Option<Value>, VisionError> {
            Err(VisionError::Timeout { ms: 5000 })
        }
    }

    struct Echo;

    impl VisionQuery for Echo {
        fn query(&self, frames: &[Frame], _: &str) -> Result<Option<Value>, VisionError> {
            Ok(Some(json!({ "frame": frames.len() })))
        }
    }

    #[test]
    fn failures_and_cancellation_become_none() {
        let frames = [Frame::new(1, None)];
        assert!(query_or_none(Some(&Failing), &frames, VisionPrompt::Grip, None).is_none());
        assert!(query_or_none(Some(&Echo), &frames, VisionPrompt::Grip, None).is_some());
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(query_or_none(Some(&Echo), &frames, VisionPrompt::Grip, Some(&cancel)).is_none());
        assert!(query_or_none::<Echo>(None, &frames, VisionPrompt::Grip, None).is_none());
    }

    #[test]
    fn prompts_round_trip_by_text_and_key() {
        for p in VisionPrompt::ALL {
            assert_eq!(VisionPrompt::from_prompt(p.text()), Some(p));
            assert_eq!(VisionPrompt::from_prompt(p.key()), Some(p));
        }
        assert_eq!(VisionPrompt::from_prompt("what?"), None);
    }

    #[test]
    fn gray_cropper_needs_pixels() {
        let roi = NormRect {
            x: 0.25,
            y: 0.25,
            w: 0.5,
            h: 0.5,
        };
        assert!(GrayCropper.crop(&Frame::new(3, Some(0.1)), &roi).is_none());
        let frame = Frame::new(3, Some(0.1)).with_image(GrayImage::filled(8, 8, 9));
        let crop = GrayCropper.crop(&frame, &roi).expect("crop");
        assert_eq!(crop.index, 3);
        let img = crop.image.expect("pixels");
        assert_eq!((img.width, img.height), (4, 4));
    }
}
