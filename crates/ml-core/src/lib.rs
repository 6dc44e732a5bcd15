//! Model capability for the detection pipeline.
//!
//! Wraps a DETR/YOLOS-family detection transformer exported to ONNX and
//! exposes it through the [`PredictionSource`] trait: given an RGB image and
//! a target size, produce `(score, class id, box)` candidates with box
//! coordinates already scaled to the target. Callers never see tensors.

pub mod labels;
pub mod model;

pub use model::{DetectionModel, ModelConfig, ModelError, RawPrediction};

/// Seam between the pipeline and the underlying detection model.
///
/// Implementations must be safe to call from multiple threads; inference
/// against shared weights is read-only and any mutable session state has to
/// be synchronized internally.
pub trait PredictionSource {
    /// Run inference on `image` and return every candidate prediction with
    /// box coordinates scaled to `target` (width, height) pixels.
    ///
    /// No confidence filtering is applied here; the caller owns the
    /// threshold.
    fn predict(
        &self,
        image: &image::RgbImage,
        target: (u32, u32),
    ) -> Result<Vec<RawPrediction>, ModelError>;

    /// Resolve a class id against the model's closed vocabulary.
    ///
    /// Returns `None` for ids outside the vocabulary or padding entries.
    fn label(&self, class_id: u32) -> Option<&str>;
}
