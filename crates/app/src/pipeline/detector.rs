//! Detector stage: turns raw model candidates into normalized detections.
//!
//! Delegates inference to the shared model capability, keeps candidates at or
//! above the confidence threshold, resolves class ids against the closed
//! vocabulary, and rounds box coordinates to integer pixels exactly once.
//! Everything downstream (renderer and serializer) consumes the integers
//! produced here.

use std::sync::Arc;

use image::RgbImage;
use ml_core::PredictionSource;
use tracing::debug;

use crate::pipeline::{
    data::{BoundingBox, Detection},
    error::PipelineError,
};

/// Threshold-filtered detector over a shared, read-only model handle.
pub struct Detector {
    source: Arc<dyn PredictionSource + Send + Sync>,
    threshold: f32,
}

impl Detector {
    /// Wrap a model capability with a confidence threshold in (0, 1].
    pub fn new(source: Arc<dyn PredictionSource + Send + Sync>, threshold: f32) -> Self {
        Self { source, threshold }
    }

    /// Confidence threshold this detector filters with.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Detect objects in `image`, returning detections in model output order
    /// with boxes in absolute pixels of `image`.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, PipelineError> {
        let target = image.dimensions();
        let candidates = self.source.predict(image, target)?;
        let total = candidates.len();

        let mut detections = Vec::new();
        for candidate in candidates {
            // Inclusive comparison: a score exactly at the threshold is kept.
            if candidate.score < self.threshold {
                continue;
            }
            let label = self
                .source
                .label(candidate.class_id)
                .ok_or(PipelineError::UnknownLabel {
                    class_id: candidate.class_id,
                })?
                .to_owned();
            detections.push(Detection {
                label,
                score: candidate.score,
                bbox: round_bbox(candidate.bbox),
            });
        }

        debug!(
            candidates = total,
            retained = detections.len(),
            threshold = self.threshold,
            "detection complete"
        );
        Ok(detections)
    }
}

/// Round to the nearest integer pixel, then order the corners so that
/// `x1 <= x2` and `y1 <= y2`. This is the single place coordinates are
/// rounded.
fn round_bbox(bbox: [f32; 4]) -> BoundingBox {
    let x_a = bbox[0].round() as i64;
    let y_a = bbox[1].round() as i64;
    let x_b = bbox[2].round() as i64;
    let y_b = bbox[3].round() as i64;
    BoundingBox {
        x1: x_a.min(x_b),
        y1: y_a.min(y_b),
        x2: x_a.max(x_b),
        y2: y_a.max(y_b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_core::{ModelError, RawPrediction};

    /// Stub capability returning a fixed candidate list.
    struct StubSource {
        predictions: Vec<RawPrediction>,
    }

    impl PredictionSource for StubSource {
        fn predict(
            &self,
            _image: &RgbImage,
            _target: (u32, u32),
        ) -> Result<Vec<RawPrediction>, ModelError> {
            Ok(self.predictions.clone())
        }

        fn label(&self, class_id: u32) -> Option<&str> {
            ml_core::labels::label(class_id)
        }
    }

    fn candidate(score: f32, class_id: u32, bbox: [f32; 4]) -> RawPrediction {
        RawPrediction {
            score,
            class_id,
            bbox,
        }
    }

    fn detector_with(predictions: Vec<RawPrediction>, threshold: f32) -> Detector {
        Detector::new(Arc::new(StubSource { predictions }), threshold)
    }

    fn blank_image() -> RgbImage {
        RgbImage::new(64, 48)
    }

    #[test]
    fn threshold_comparison_is_inclusive() {
        let detector = detector_with(
            vec![
                candidate(0.9, 17, [1.0, 2.0, 10.0, 12.0]),
                candidate(0.8999, 17, [3.0, 4.0, 11.0, 13.0]),
            ],
            0.9,
        );
        let detections = detector.detect(&blank_image()).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].score, 0.9);
    }

    #[test]
    fn higher_threshold_yields_subset() {
        let predictions = vec![
            candidate(0.95, 17, [1.0, 2.0, 10.0, 12.0]),
            candidate(0.75, 18, [5.0, 5.0, 20.0, 20.0]),
            candidate(0.60, 1, [0.0, 0.0, 8.0, 8.0]),
        ];
        let loose = detector_with(predictions.clone(), 0.5)
            .detect(&blank_image())
            .unwrap();
        let strict = detector_with(predictions, 0.9)
            .detect(&blank_image())
            .unwrap();
        assert_eq!(loose.len(), 3);
        assert_eq!(strict.len(), 1);
        for detection in &strict {
            assert!(loose.contains(detection));
        }
    }

    #[test]
    fn coordinates_round_to_nearest_and_are_ordered() {
        let detector = detector_with(vec![candidate(0.99, 17, [10.6, 3.4, 2.2, 20.5])], 0.5);
        let detections = detector.detect(&blank_image()).unwrap();
        let bbox = detections[0].bbox;
        // 10.6 and 2.2 round to 11 and 2, then swap into order.
        assert_eq!(
            bbox,
            BoundingBox {
                x1: 2,
                y1: 3,
                x2: 11,
                y2: 21
            }
        );
        assert!(bbox.x1 <= bbox.x2 && bbox.y1 <= bbox.y2);
    }

    #[test]
    fn unknown_class_id_is_fatal() {
        let detector = detector_with(vec![candidate(0.99, 12, [1.0, 1.0, 5.0, 5.0])], 0.5);
        let err = detector.detect(&blank_image()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownLabel { class_id: 12 }
        ));
    }

    #[test]
    fn unknown_class_below_threshold_is_ignored() {
        // Filtering happens before label resolution, so a low-confidence
        // candidate with a padding id never reaches the vocabulary check.
        let detector = detector_with(
            vec![
                candidate(0.2, 12, [1.0, 1.0, 5.0, 5.0]),
                candidate(0.95, 17, [1.0, 1.0, 5.0, 5.0]),
            ],
            0.9,
        );
        let detections = detector.detect(&blank_image()).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "cat");
    }

    #[test]
    fn detect_is_idempotent() {
        let detector = detector_with(
            vec![
                candidate(0.95, 17, [1.4, 2.6, 10.1, 12.9]),
                candidate(0.92, 18, [5.0, 5.0, 20.0, 20.0]),
            ],
            0.9,
        );
        let image = blank_image();
        let first = detector.detect(&image).unwrap();
        let second = detector.detect(&image).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn order_follows_model_output() {
        let detector = detector_with(
            vec![
                candidate(0.91, 18, [0.0, 0.0, 4.0, 4.0]),
                candidate(0.99, 17, [8.0, 8.0, 16.0, 16.0]),
            ],
            0.9,
        );
        let detections = detector.detect(&blank_image()).unwrap();
        // Not sorted by score; upstream order is preserved.
        assert_eq!(detections[0].label, "dog");
        assert_eq!(detections[1].label, "cat");
    }
}
