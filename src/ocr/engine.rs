//! OCR engine collaborator.
//!
//! The engine is best-effort and potentially unreliable; the extraction
//! layer compensates with its preprocessing fallback chain. The provided
//! implementation shells out to a Tesseract executable.

use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use std::env;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

/// Environment variable overriding Tesseract executable discovery.
const TESSERACT_ENV: &str = "TESSERACT_EXE";

/// Page segmentation tuned to the shape of the region being read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecognitionMode {
    /// A single line of text (player names).
    SingleLine,
    /// A sparse block of text (numeric stat boxes).
    SparseBlock,
}

impl RecognitionMode {
    fn psm(self) -> &'static str {
        match self {
            RecognitionMode::SingleLine => "7",
            RecognitionMode::SparseBlock => "6",
        }
    }
}

/// Per-call recognition options: character whitelist plus segmentation mode.
#[derive(Clone, Copy, Debug)]
pub struct OcrOptions<'a> {
    pub whitelist: &'a str,
    pub mode: RecognitionMode,
}

/// Text recognition over a pixel block. Implementations return the raw
/// recognized text; an empty string means nothing was read.
pub trait OcrEngine {
    fn recognize(&self, image: &DynamicImage, options: &OcrOptions<'_>) -> Result<String>;
}

/// Runs the Tesseract executable over a temporary PNG per call.
pub struct TesseractEngine {
    executable: PathBuf,
}

impl TesseractEngine {
    /// Locates Tesseract and builds an engine around it.
    pub fn new() -> Result<Self> {
        Ok(Self { executable: find_tesseract_executable()? })
    }

    pub fn with_executable(executable: PathBuf) -> Self {
        Self { executable }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &DynamicImage, options: &OcrOptions<'_>) -> Result<String> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image
            .save(temp_input.path())
            .context("failed to write OCR input image")?;

        let output = Command::new(&self.executable)
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg("eng")
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg(options.mode.psm())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", options.whitelist))
            .output()
            .context("failed to run tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Locates the Tesseract executable: env override first, then PATH, then the
/// platform data directory.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    if let Ok(overridden) = env::var(TESSERACT_ENV) {
        let path = PathBuf::from(overridden);
        if path.exists() {
            return Ok(path);
        }
        log::warn!("{} points at a missing file: {}", TESSERACT_ENV, path.display());
    }

    let on_path = Command::new("tesseract")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if on_path {
        return Ok(PathBuf::from("tesseract"));
    }

    let local = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fleet-stats")
        .join("tesseract")
        .join(executable_name());
    if local.exists() {
        return Ok(local);
    }

    Err(anyhow!(
        "tesseract executable not found; install it on PATH or set {}",
        TESSERACT_ENV
    ))
}

fn executable_name() -> &'static str {
    if cfg!(windows) { "tesseract.exe" } else { "tesseract" }
}
