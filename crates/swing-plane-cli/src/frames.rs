//! Frame image decoding.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use swing_plane::PoseSequence;
use swing_plane_core::GrayImage;

#[derive(thiserror::Error, Debug)]
pub enum FrameLoadError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{path} has unusable dimensions {width}x{height}")]
    Dimensions {
        path: PathBuf,
        width: u32,
        height: u32,
    },
}

/// Decode one image file into a grayscale buffer.
pub fn load_gray(path: &Path) -> Result<GrayImage, FrameLoadError> {
    let img = image::open(path)
        .map_err(|source| FrameLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma8();
    let (width, height) = img.dimensions();
    GrayImage::from_raw(width as usize, height as usize, img.into_raw()).ok_or_else(|| {
        FrameLoadError::Dimensions {
            path: path.to_path_buf(),
            width,
            height,
        }
    })
}

/// Attach the images named in the pose document; relative paths resolve
/// against `base`.
///
/// With `strict` a frame that fails to load aborts; otherwise it stays
/// without pixels and the address detectors skip it.
pub fn attach_images(
    seq: &mut PoseSequence,
    base: &Path,
    strict: bool,
) -> Result<usize, FrameLoadError> {
    let mut loaded = 0;
    for (frame, rel) in seq.frames.iter_mut().zip(&seq.image_paths) {
        let Some(rel) = rel else {
            continue;
        };
        let path = base.join(rel);
        match load_gray(&path) {
            Ok(img) => {
                frame.image = Some(img);
                loaded += 1;
            }
            Err(err) if !strict => warn!("frame {}: {err}", frame.index),
            Err(err) => return Err(err),
        }
    }
    debug!("loaded {loaded} frame images");
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_png_frames_to_gray() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("f1.png");
        image::RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10]))
            .save(&path)
            .expect("save");
        let gray = load_gray(&path).expect("decode");
        assert_eq!((gray.width, gray.height), (4, 3));
    }

    #[test]
    fn missing_images_are_skipped_unless_strict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = json!({"frames": [{"idx": 1, "image": "nope.png"}]});
        let mut seq = PoseSequence::from_json(&doc).expect("poses");
        assert_eq!(attach_images(&mut seq, dir.path(), false).expect("lenient"), 0);
        assert!(seq.frames[0].image.is_none());
        assert!(attach_images(&mut seq, dir.path(), true).is_err());
    }
}
