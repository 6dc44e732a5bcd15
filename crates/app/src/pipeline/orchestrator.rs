//! Orchestrator tying the stages together for a single invocation.
//!
//! Sequence: decode/normalize, detect, then render and serialize against the
//! exact same detection set, then JPEG-encode. Render and serialize are never
//! re-derived independently, which is what keeps the two artifacts
//! describing identical detections. Any stage failure aborts the invocation
//! with no partial output.

use std::{fs, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use ml_core::DetectionModel;
use tracing::{debug, info};

use crate::pipeline::{
    annotation::{self, ColorPicker, RandomPalette},
    config::InferConfig,
    data::PipelineOutput,
    detector::Detector,
    encoding::{self, JPEG_QUALITY},
    error::PipelineError,
    report,
};

/// Run the full pipeline on one encoded image.
pub fn run_pipeline(
    detector: &Detector,
    input_bytes: &[u8],
    picker: &mut dyn ColorPicker,
    jpeg_quality: u8,
) -> Result<PipelineOutput, PipelineError> {
    let invocation_span = tracing::info_span!("pipeline.run", bytes = input_bytes.len());
    let _guard = invocation_span.enter();

    let image = encoding::decode_image(input_bytes)?;
    debug!(
        width = image.width(),
        height = image.height(),
        "input decoded"
    );

    let inference_start = Instant::now();
    let detections = detector.detect(&image)?;
    metrics::histogram!("snapdetect_inference_seconds")
        .record(inference_start.elapsed().as_secs_f64());
    metrics::counter!("snapdetect_detections_total").increment(detections.len() as u64);

    // Renderer and serializer consume the identical detection set.
    let annotated = annotation::render(&image, &detections, picker);
    let report = report::build_report(&detections);
    let jpeg = encoding::encode_jpeg(&annotated, jpeg_quality)?;

    metrics::counter!("snapdetect_invocations_total", "outcome" => "ok").increment(1);
    Ok(PipelineOutput {
        jpeg,
        report,
        detections,
    })
}

/// CLI batch runner: read a file, run the pipeline once, persist both
/// artifacts, print the report to stdout.
pub fn run_infer(config: InferConfig) -> Result<()> {
    let model = DetectionModel::load(&config.model_path)
        .with_context(|| format!("failed to load model from {}", config.model_path.display()))?;
    let detector = Detector::new(Arc::new(model), config.threshold);

    let input_bytes = fs::read(&config.input)
        .with_context(|| format!("failed to read {}", config.input.display()))?;

    let mut picker = RandomPalette::default();
    let output = run_pipeline(&detector, &input_bytes, &mut picker, JPEG_QUALITY)
        .with_context(|| format!("pipeline failed for {}", config.input.display()))?;

    fs::write(&config.output, &output.jpeg)
        .with_context(|| format!("failed to write {}", config.output.display()))?;
    info!("saved annotated image to {}", config.output.display());
    println!("Saved output image with detections to: {}", config.output.display());

    let json = serde_json::to_string_pretty(&output.report)?;
    fs::write(&config.json_out, &json)
        .with_context(|| format!("failed to write {}", config.json_out.display()))?;
    println!("{json}");

    Ok(())
}
