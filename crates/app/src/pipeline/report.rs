//! Serializer stage: detection set to JSON report.
//!
//! Pure function of the detection set. Order is preserved and the score is
//! reported as a percentage rounded to two decimals, the same value used by
//! the renderer's label text.

use crate::pipeline::data::{Detection, DetectionReport, ReportEntry};

/// Build the JSON report for a detection set.
pub fn build_report(detections: &[Detection]) -> DetectionReport {
    DetectionReport {
        detected_objects: detections
            .iter()
            .map(|detection| ReportEntry {
                label: detection.label.clone(),
                score: detection.score_percent(),
                bounding_box: detection.bbox,
            })
            .collect(),
    }
}
