//! Detection-to-visualization-to-response pipeline.
//!
//! The module is split into focused submodules:
//! - `config`: CLI configuration parsing for both delivery adapters.
//! - `data`: Shared structs passed between stages and serialized outward.
//! - `error`: Typed failure kinds; every failure aborts the invocation.
//! - `detector`: Threshold filtering, label resolution, coordinate rounding.
//! - `annotation`: Box and label drawing onto the source raster.
//! - `encoding`: Input decode/normalization and JPEG output encoding.
//! - `report`: JSON report built from the same detection set the renderer saw.
//! - `orchestrator`: Composes the stages for one invocation; CLI runner.
//! - `server`: Actix Web upload endpoint.
//! - `telemetry`: Tracing subscriber and Prometheus metrics recorder.

pub use config::{InferConfig, ServeConfig};
pub use data::{BoundingBox, Detection, DetectionReport, PipelineOutput};
pub use detector::Detector;
pub use error::PipelineError;
pub use orchestrator::{run_infer, run_pipeline};
pub use server::run_serve;

pub mod annotation;
pub mod config;
pub mod data;
pub mod detector;
pub mod encoding;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod server;
pub mod telemetry;
