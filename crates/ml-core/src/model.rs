//! ONNX Runtime session wrapper for the detection transformer.
//!
//! The model takes a normalized `pixel_values` tensor and emits per-query
//! class `logits` plus normalized `pred_boxes` in cxcywh form. Post-processing
//! follows the checkpoint's reference recipe: softmax over the classifier
//! head, drop the trailing "no object" class, and scale boxes to the caller's
//! target size so candidates leave this crate in absolute pixels.

use std::{
    path::Path,
    sync::Mutex,
};

use image::{imageops::FilterType, RgbImage};
use ndarray::Array2;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tracing::debug;

use crate::{labels, PredictionSource};

/// Per-channel normalization constants the checkpoint was trained with.
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Errors surfaced by the model capability.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("onnx runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("model output has unexpected shape: {0}")]
    BadOutput(String),
    #[error("model session lock poisoned")]
    Poisoned,
}

/// One raw candidate prediction at original-image scale.
///
/// `bbox` is `[x1, y1, x2, y2]` in absolute pixels of the target size passed
/// to [`DetectionModel::predict`]. Scores are raw softmax probabilities in
/// `[0, 1]`; no threshold has been applied yet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub score: f32,
    pub class_id: u32,
    pub bbox: [f32; 4],
}

/// Static configuration for a loaded session.
#[derive(Debug, Clone, Copy)]
pub struct ModelConfig {
    /// Width the input image is resized to before inference.
    pub input_width: u32,
    /// Height the input image is resized to before inference.
    pub input_height: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_width: 512,
            input_height: 512,
        }
    }
}

/// Detection transformer session loaded once at process start and shared
/// read-only for the process lifetime.
///
/// `ort` sessions require `&mut` to run, so inference is serialized behind an
/// internal mutex; the wrapper itself is safe to share across threads.
pub struct DetectionModel {
    session: Mutex<Session>,
    config: ModelConfig,
}

impl DetectionModel {
    /// Load an ONNX checkpoint with the default input size.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, ModelError> {
        Self::load_with_config(model_path, ModelConfig::default())
    }

    /// Load an ONNX checkpoint and prepare the session for CPU execution.
    pub fn load_with_config<P: AsRef<Path>>(
        model_path: P,
        config: ModelConfig,
    ) -> Result<Self, ModelError> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path)?;
        debug!(
            input_width = config.input_width,
            input_height = config.input_height,
            "detection model loaded"
        );
        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    /// Input size the session expects.
    pub fn input_size(&self) -> (u32, u32) {
        (self.config.input_width, self.config.input_height)
    }

    /// Resize to the session input size and build a normalized NCHW tensor.
    fn preprocess(&self, image: &RgbImage) -> ([usize; 4], Vec<f32>) {
        let (in_w, in_h) = (self.config.input_width, self.config.input_height);
        let resized = if image.dimensions() == (in_w, in_h) {
            image.clone()
        } else {
            image::imageops::resize(image, in_w, in_h, FilterType::Triangle)
        };

        let plane = (in_w * in_h) as usize;
        let raw = resized.as_raw();
        let mut data = vec![0f32; 3 * plane];
        for idx in 0..plane {
            for c in 0..3 {
                data[c * plane + idx] =
                    (raw[idx * 3 + c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }

        ([1, 3, in_h as usize, in_w as usize], data)
    }

    /// Run inference and return every query's best real-class candidate,
    /// with boxes scaled to `target` (width, height) pixels.
    pub fn predict(
        &self,
        image: &RgbImage,
        target: (u32, u32),
    ) -> Result<Vec<RawPrediction>, ModelError> {
        let (shape, data) = self.preprocess(image);
        let input = Tensor::from_array((shape, data.into_boxed_slice()))?;

        let mut session = self.session.lock().map_err(|_| ModelError::Poisoned)?;
        let outputs = session.run(inputs!["pixel_values" => input])?;

        let (logits_shape, logits_data) = outputs["logits"].try_extract_tensor::<f32>()?;
        if logits_shape.len() != 3 || logits_shape[0] != 1 {
            return Err(ModelError::BadOutput(format!(
                "logits shape {logits_shape:?}"
            )));
        }
        let num_queries = logits_shape[1] as usize;
        let num_classes = logits_shape[2] as usize;
        if num_classes < 2 {
            return Err(ModelError::BadOutput(format!(
                "classifier head has {num_classes} classes"
            )));
        }
        if num_classes - 1 != labels::NUM_CLASSES {
            debug!(
                head_classes = num_classes - 1,
                vocabulary = labels::NUM_CLASSES,
                "classifier head size differs from label vocabulary"
            );
        }

        let (boxes_shape, boxes_data) = outputs["pred_boxes"].try_extract_tensor::<f32>()?;
        if boxes_shape.len() != 3 || boxes_shape[0] != 1 || boxes_shape[2] != 4 {
            return Err(ModelError::BadOutput(format!(
                "pred_boxes shape {boxes_shape:?}"
            )));
        }
        if boxes_shape[1] as usize != num_queries {
            return Err(ModelError::BadOutput(format!(
                "query count mismatch: {} logits vs {} boxes",
                num_queries, boxes_shape[1]
            )));
        }

        let logits = Array2::from_shape_vec((num_queries, num_classes), logits_data.to_vec())
            .map_err(|err| ModelError::BadOutput(err.to_string()))?;
        let boxes = Array2::from_shape_vec((num_queries, 4), boxes_data.to_vec())
            .map_err(|err| ModelError::BadOutput(err.to_string()))?;

        let (target_w, target_h) = (target.0 as f32, target.1 as f32);
        let mut candidates = Vec::with_capacity(num_queries);
        for (row, bbox) in logits.outer_iter().zip(boxes.outer_iter()) {
            // Softmax over the full head, then drop the final no-object class.
            let max_logit = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exp: Vec<f32> = row.iter().map(|&v| (v - max_logit).exp()).collect();
            let denom: f32 = exp.iter().sum();

            let (best_id, best_exp) = exp[..num_classes - 1]
                .iter()
                .copied()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |acc, (idx, v)| {
                    if v > acc.1 { (idx, v) } else { acc }
                });
            let score = best_exp / denom;

            let (cx, cy, w, h) = (bbox[0], bbox[1], bbox[2], bbox[3]);
            candidates.push(RawPrediction {
                score,
                class_id: best_id as u32,
                bbox: [
                    (cx - 0.5 * w) * target_w,
                    (cy - 0.5 * h) * target_h,
                    (cx + 0.5 * w) * target_w,
                    (cy + 0.5 * h) * target_h,
                ],
            });
        }

        debug!(queries = num_queries, "inference complete");
        Ok(candidates)
    }
}

impl PredictionSource for DetectionModel {
    fn predict(
        &self,
        image: &RgbImage,
        target: (u32, u32),
    ) -> Result<Vec<RawPrediction>, ModelError> {
        DetectionModel::predict(self, image, target)
    }

    fn label(&self, class_id: u32) -> Option<&str> {
        labels::label(class_id)
    }
}
