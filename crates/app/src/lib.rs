//! Object-detection pipeline with two delivery adapters.
//!
//! The core lives in [`pipeline`]: decode → detect → render + serialize →
//! encode, producing an annotated JPEG and a JSON report that always
//! describe the same detections. [`cli`] dispatches the `infer` (batch) and
//! `serve` (HTTP upload) entry points.

pub mod cli;
pub mod pipeline;
