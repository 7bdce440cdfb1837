//! Per-field extraction: runs the preprocessing fallback chain over one
//! region and keeps the first transform whose OCR output is non-empty.
//! No scoring or ranking across transforms, first success wins.

use image::RgbaImage;

use super::engine::{OcrEngine, OcrOptions, RecognitionMode};
use super::preprocess::{Transform, crop_region};
use crate::layout::{FieldKind, PixelRect};

/// Characters Tesseract may emit for name regions.
const NAME_WHITELIST: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ<>#0123456789_ ";
/// Characters Tesseract may emit for numeric regions.
const NUMERIC_WHITELIST: &str = ".0123456789%";

/// Recognition options for a field kind.
pub fn ocr_options(field: FieldKind) -> OcrOptions<'static> {
    match field {
        FieldKind::Name => OcrOptions {
            whitelist: NAME_WHITELIST,
            mode: RecognitionMode::SingleLine,
        },
        _ => OcrOptions {
            whitelist: NUMERIC_WHITELIST,
            mode: RecognitionMode::SparseBlock,
        },
    }
}

/// Extracts raw text for one field region, or `None` when every transform
/// came back blank. Engine errors on a single transform count as blank; the
/// chain keeps going.
pub fn extract_field(
    engine: &dyn OcrEngine,
    image: &RgbaImage,
    rect: &PixelRect,
    field: FieldKind,
) -> Option<String> {
    let segment = crop_region(image, rect);
    if segment.width() == 0 || segment.height() == 0 {
        log::warn!("{} region {:?} is outside the image", field.label(), rect);
        return None;
    }

    let options = ocr_options(field);
    for transform in Transform::CHAIN {
        let prepared = transform.apply(&segment);
        match engine.recognize(&prepared, &options) {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    log::debug!("{} read via {:?}: {:?}", field.label(), transform, text);
                    return Some(text.to_string());
                }
            }
            Err(e) => {
                log::debug!("{} OCR error on {:?}: {:#}", field.label(), transform, e);
            }
        }
    }

    None
}
