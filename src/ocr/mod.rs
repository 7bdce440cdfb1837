//! OCR boundary: the engine trait and its Tesseract implementation, the
//! preprocessing fallback chain, per-field extraction, and text cleanup.

pub mod engine;
pub mod extract;
pub mod normalize;
pub mod preprocess;

pub use engine::{OcrEngine, OcrOptions, RecognitionMode, TesseractEngine};
pub use extract::extract_field;
