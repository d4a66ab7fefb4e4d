//! Dark/bright separation of a crop.

use swing_plane_core::GrayImage;

/// Otsu threshold of a set of intensities.
pub fn otsu_threshold(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }
    let (min_v, max_v) = samples
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;
    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }
    best_t
}

/// Pixels at or below the Otsu threshold of `img`.
#[derive(Clone, Debug, PartialEq)]
pub struct DarkMask {
    pub width: usize,
    pub height: usize,
    pub threshold: u8,
    pub mask: Vec<bool>,
}

impl DarkMask {
    /// `None` when the crop has no usable contrast: the mean intensities on
    /// either side of the threshold differ by less than `min_contrast`.
    pub fn from_image(img: &GrayImage, min_contrast: f32) -> Option<Self> {
        let threshold = otsu_threshold(&img.data);
        let (mut dark_sum, mut dark_n, mut bright_sum, mut bright_n) = (0u64, 0u64, 0u64, 0u64);
        for &v in &img.data {
            if v <= threshold {
                dark_sum += v as u64;
                dark_n += 1;
            } else {
                bright_sum += v as u64;
                bright_n += 1;
            }
        }
        if dark_n == 0 || bright_n == 0 {
            return None;
        }
        let contrast = bright_sum as f32 / bright_n as f32 - dark_sum as f32 / dark_n as f32;
        if contrast < min_contrast {
            return None;
        }
        Some(Self {
            width: img.width,
            height: img.height,
            threshold,
            mask: img.data.iter().map(|&v| v <= threshold).collect(),
        })
    }

    #[inline]
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.mask[y * self.width + x]
    }

    pub fn dark_pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, &d)| d)
            .map(|(i, _)| (i % self.width, i / self.width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otsu_splits_bimodal_samples() {
        let mut samples = vec![20u8; 50];
        samples.extend(vec![30u8; 10]);
        samples.extend(vec![200u8; 60]);
        let t = otsu_threshold(&samples);
        assert!((30..200).contains(&t));
        assert_eq!(otsu_threshold(&[]), 127);
        assert_eq!(otsu_threshold(&[9, 9, 9]), 9);
        assert_eq!(otsu_threshold(&[10, 20]), 15);
    }

    #[test]
    fn flat_crops_have_no_mask() {
        assert!(DarkMask::from_image(&GrayImage::filled(8, 8, 120), 20.0).is_none());
        let mut img = GrayImage::filled(8, 8, 220);
        img.set(2, 3, 10);
        img.set(3, 3, 12);
        img.set(4, 3, 15);
        let mask = DarkMask::from_image(&img, 20.0).expect("contrast");
        let dark: Vec<_> = mask.dark_pixels().collect();
        assert_eq!(dark, vec![(2, 3), (3, 3), (4, 3)]);
    }
}
