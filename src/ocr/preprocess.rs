//! Image preprocessing transforms for the OCR fallback chain.
//!
//! Each transform is independent; the extractor tries them in a fixed order
//! and keeps the first one whose OCR output is non-empty.

use image::{DynamicImage, GrayImage, Luma, RgbaImage, imageops};

use crate::layout::PixelRect;

/// Sigma matching a 5×5 Gaussian kernel.
const BLUR_SIGMA: f32 = 1.1;
/// Adaptive threshold neighborhood side length.
const ADAPTIVE_WINDOW: u32 = 31;
/// Constant subtracted from the neighborhood mean.
const ADAPTIVE_C: i32 = 2;
/// Contrast gain for the brightness/contrast boost step.
const CONTRAST_ALPHA: f32 = 1.5;
/// Brightness lift for the brightness/contrast boost step.
const BRIGHTNESS_BETA: f32 = 30.0;

/// Preprocessing steps tried in order until OCR yields text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    Identity,
    Grayscale,
    OtsuThreshold,
    GaussianBlur,
    AdaptiveThreshold,
    BrightnessContrast,
}

impl Transform {
    /// The fallback chain. The raw segment goes first so clean captures skip
    /// the heavier steps entirely.
    pub const CHAIN: [Transform; 6] = [
        Transform::Identity,
        Transform::Grayscale,
        Transform::OtsuThreshold,
        Transform::GaussianBlur,
        Transform::AdaptiveThreshold,
        Transform::BrightnessContrast,
    ];

    pub fn apply(self, segment: &RgbaImage) -> DynamicImage {
        match self {
            Transform::Identity => DynamicImage::ImageRgba8(segment.clone()),
            Transform::Grayscale => DynamicImage::ImageLuma8(imageops::grayscale(segment)),
            Transform::OtsuThreshold => {
                DynamicImage::ImageLuma8(otsu_threshold(&imageops::grayscale(segment)))
            }
            Transform::GaussianBlur => {
                DynamicImage::ImageLuma8(imageops::blur(&imageops::grayscale(segment), BLUR_SIGMA))
            }
            Transform::AdaptiveThreshold => DynamicImage::ImageLuma8(adaptive_threshold(
                &imageops::grayscale(segment),
                ADAPTIVE_WINDOW,
                ADAPTIVE_C,
            )),
            Transform::BrightnessContrast => DynamicImage::ImageLuma8(adjust_brightness_contrast(
                &imageops::grayscale(segment),
                CONTRAST_ALPHA,
                BRIGHTNESS_BETA,
            )),
        }
    }
}

/// Crops a region from the image, clamped to the image bounds.
pub fn crop_region(img: &RgbaImage, rect: &PixelRect) -> RgbaImage {
    let (w, h) = img.dimensions();
    let x0 = rect.left.min(w);
    let y0 = rect.top.min(h);
    let rw = rect.right.min(w).saturating_sub(x0);
    let rh = rect.bottom.min(h).saturating_sub(y0);
    imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Global binarization at the Otsu level: pixels above the level become
/// white, the rest black.
pub fn otsu_threshold(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    threshold(gray, level)
}

/// Picks the gray level that maximizes between-class variance of the
/// histogram.
pub fn otsu_level(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total = u64::from(gray.width()) * u64::from(gray.height());
    if total == 0 {
        return 0;
    }

    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(value, &count)| value as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0_f64;
    let mut weight_background = 0u64;
    let mut best_level = 0u8;
    let mut best_variance = -1.0_f64;

    for level in 0..256usize {
        weight_background += histogram[level];
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += level as f64 * histogram[level] as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_all - sum_background) / weight_foreground as f64;
        let between = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between > best_variance {
            best_variance = between;
            best_level = level as u8;
        }
    }

    best_level
}

fn threshold(gray: &GrayImage, level: u8) -> GrayImage {
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if pixel[0] > level { 255u8 } else { 0u8 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Adaptive mean threshold with inverted output: pixels darker than their
/// neighborhood mean (minus `c`) become white, everything else black. Suits
/// dark text on uneven backgrounds.
pub fn adaptive_threshold(gray: &GrayImage, window: u32, c: i32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }

    // Summed-area table, one extra row/column of zeros.
    let stride = (w + 1) as usize;
    let mut integral = vec![0u64; stride * (h + 1) as usize];
    for y in 0..h as usize {
        for x in 0..w as usize {
            let idx = (y + 1) * stride + (x + 1);
            integral[idx] = u64::from(gray.get_pixel(x as u32, y as u32)[0])
                + integral[idx - 1]
                + integral[idx - stride]
                - integral[idx - stride - 1];
        }
    }

    let radius = i64::from(window / 2);
    for y in 0..h {
        for x in 0..w {
            let x0 = (i64::from(x) - radius).max(0) as usize;
            let y0 = (i64::from(y) - radius).max(0) as usize;
            let x1 = (i64::from(x) + radius).min(i64::from(w) - 1) as usize;
            let y1 = (i64::from(y) + radius).min(i64::from(h) - 1) as usize;

            let sum = integral[(y1 + 1) * stride + (x1 + 1)]
                + integral[y0 * stride + x0]
                - integral[y0 * stride + (x1 + 1)]
                - integral[(y1 + 1) * stride + x0];
            let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as i64;
            let mean = sum as i64 / count;

            let value = if i64::from(gray.get_pixel(x, y)[0]) > mean - i64::from(c) {
                0u8
            } else {
                255u8
            };
            out.put_pixel(x, y, Luma([value]));
        }
    }

    out
}

/// Linear brightness/contrast adjustment: `alpha * value + beta`, clamped to
/// the byte range.
pub fn adjust_brightness_contrast(gray: &GrayImage, alpha: f32, beta: f32) -> GrayImage {
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = (f32::from(pixel[0]) * alpha + beta).round().clamp(0.0, 255.0) as u8;
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_crop_region() {
        let img: RgbaImage =
            RgbaImage::from_fn(100, 200, |x, y| Rgba([x as u8, y as u8, 0, 255]));

        let rect = PixelRect { left: 10, top: 50, right: 60, bottom: 70 };
        let cropped = crop_region(&img, &rect);

        assert_eq!(cropped.dimensions(), (50, 20));
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_region_clamps_to_image() {
        let img = RgbaImage::new(100, 100);
        let rect = PixelRect { left: 90, top: 90, right: 150, bottom: 150 };
        let cropped = crop_region(&img, &rect);
        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn test_chain_starts_with_identity() {
        assert_eq!(Transform::CHAIN[0], Transform::Identity);
        assert_eq!(Transform::CHAIN.len(), 6);
    }

    #[test]
    fn test_identity_preserves_pixels() {
        let img: RgbaImage = RgbaImage::from_fn(4, 4, |x, _| Rgba([x as u8 * 10, 0, 0, 255]));
        let out = Transform::Identity.apply(&img).to_rgba8();
        assert_eq!(out.get_pixel(3, 0)[0], 30);
    }

    #[test]
    fn test_otsu_separates_bimodal_image() {
        let img: RgbaImage = RgbaImage::from_fn(10, 2, |_, y| {
            if y == 0 { Rgba([20, 20, 20, 255]) } else { Rgba([230, 230, 230, 255]) }
        });
        let gray = imageops::grayscale(&img);
        let level = otsu_level(&gray);
        assert!((20..230).contains(&level), "unexpected Otsu level {}", level);

        let binary = otsu_threshold(&gray);
        assert_eq!(binary.get_pixel(0, 0)[0], 0);
        assert_eq!(binary.get_pixel(0, 1)[0], 255);
    }

    #[test]
    fn test_otsu_level_of_empty_image_is_zero() {
        let gray = GrayImage::new(0, 0);
        assert_eq!(otsu_level(&gray), 0);
    }

    #[test]
    fn test_adaptive_threshold_inverts_dark_text() {
        // Dark spot in the middle of a bright field becomes white.
        let mut gray = GrayImage::from_pixel(41, 41, Luma([200]));
        gray.put_pixel(20, 20, Luma([10]));

        let out = adaptive_threshold(&gray, ADAPTIVE_WINDOW, ADAPTIVE_C);
        assert_eq!(out.get_pixel(20, 20)[0], 255);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_brightness_contrast_clamps() {
        let gray = GrayImage::from_pixel(2, 1, Luma([200]));
        let out = adjust_brightness_contrast(&gray, CONTRAST_ALPHA, BRIGHTNESS_BETA);
        // 200 * 1.5 + 30 overflows the byte range and clamps.
        assert_eq!(out.get_pixel(0, 0)[0], 255);

        let dark = GrayImage::from_pixel(1, 1, Luma([40]));
        let out = adjust_brightness_contrast(&dark, CONTRAST_ALPHA, BRIGHTNESS_BETA);
        assert_eq!(out.get_pixel(0, 0)[0], 90);
    }
}
