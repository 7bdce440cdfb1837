//! Fleet Stats
//!
//! Extracts per-player stats from fixed-layout match result screenshots and
//! resolves the recovered names against a registry of known players.
//!
//! The pipeline runs region mapping → OCR with a preprocessing fallback
//! chain → text cleanup and stat reconciliation → identity resolution.
//! The OCR engine, the registry, and the record sink are injected
//! collaborators; the rest of the core is a pure function of its inputs.

pub mod config;
pub mod layout;
pub mod ocr;
pub mod persist;
pub mod pipeline;
pub mod registry;
pub mod resolve;

pub use config::ExtractionConfig;
pub use pipeline::{Pipeline, PipelineError, PlayerRecord};
