//! Seam to the face analysis engine.
//!
//! Detection and embedding extraction are supplied by the embedding
//! application; the pipeline only needs per-image face embeddings.

use image::RgbImage;
use thiserror::Error;

use crate::matcher::Embedding;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no analysis engine loaded: {0}")]
    NotLoaded(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// One detected face.
#[derive(Debug, Clone)]
pub struct Face {
    pub embedding: Embedding,
}

/// Face detection plus embedding extraction over one working-resolution image.
pub trait FaceEngine: Send {
    /// Detect faces and extract an embedding per face, in detection order.
    fn analyze(&mut self, image: &RgbImage) -> Result<Vec<Face>, EngineError>;
}

/// Placeholder engine for deployments without a wired model. Every item
/// analyzed through it surfaces as a processing-error row.
pub struct UnavailableEngine;

impl FaceEngine for UnavailableEngine {
    fn analyze(&mut self, _image: &RgbImage) -> Result<Vec<Face>, EngineError> {
        Err(EngineError::NotLoaded("no model configured".into()))
    }
}
