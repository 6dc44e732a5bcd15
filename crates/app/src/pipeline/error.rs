use ml_core::ModelError;

/// Failure kinds for one pipeline invocation.
///
/// Every variant is fatal: an invocation either produces both artifacts
/// (annotated image and report) from the same detection set, or neither.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Input bytes are not a decodable image.
    #[error("failed to decode input image")]
    Decode(#[source] image::ImageError),

    /// The model capability failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// A retained prediction carries a class id outside the closed
    /// vocabulary. The vocabulary is fixed by the loaded model, so this is
    /// an internal invariant violation.
    #[error("class id {class_id} is not in the label vocabulary")]
    UnknownLabel { class_id: u32 },

    /// The annotated raster could not be JPEG-encoded.
    #[error("failed to encode annotated image")]
    Encode(#[source] image::ImageError),
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        PipelineError::Inference(err.to_string())
    }
}
