use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in absolute pixel coordinates of the original
/// image, with `x1 <= x2` and `y1 <= y2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

/// One retained prediction. Coordinates were rounded exactly once in the
/// detector; the renderer and the serializer both consume these integers so
/// the drawn box and the reported box can never disagree.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    /// Raw confidence in [0, 1]; already at or above the run's threshold.
    pub score: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Confidence as a percentage rounded to two decimals, the form used in
    /// both the rendered label text and the JSON report.
    pub fn score_percent(&self) -> f64 {
        (f64::from(self.score) * 100.0 * 100.0).round() / 100.0
    }
}

/// One entry of the JSON report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportEntry {
    pub label: String,
    /// Percentage in [0, 100], rounded to two decimals.
    pub score: f64,
    pub bounding_box: BoundingBox,
}

/// JSON-compatible summary of all retained detections for one image.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectionReport {
    #[serde(rename = "Detected Objects")]
    pub detected_objects: Vec<ReportEntry>,
}

/// The two co-derived artifacts of one pipeline invocation plus the
/// detection set both were built from.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Annotated image, already flattened to RGB and JPEG-encoded.
    pub jpeg: Vec<u8>,
    pub report: DetectionReport,
    pub detections: Vec<Detection>,
}

/// Body returned by the HTTP upload endpoint.
#[derive(Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub json_result: DetectionReport,
    /// Absolute server-side path where the annotated JPEG was persisted.
    pub image_path: String,
    pub image_base64: String,
}
