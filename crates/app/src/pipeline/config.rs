//! CLI configuration parsing for the two delivery adapters.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

/// Default confidence threshold, matching the model card's recommendation.
pub const DEFAULT_THRESHOLD: f32 = 0.9;
const DEFAULT_MODEL_PATH: &str = "models/yolos-tiny.onnx";
const DEFAULT_JSON_OUT: &str = "detection_results.json";

const INFER_USAGE: &str = "Usage: snapdetect infer <input-image> <output-image> \
[--threshold <0..1>] [--model <path>] [--json-out <path>]";
const SERVE_USAGE: &str = "Usage: snapdetect serve [--host <addr>] [--port <port>] \
[--threshold <0..1>] [--model <path>] [--output-dir <dir>]";

/// Batch runner configuration.
#[derive(Clone, Debug)]
pub struct InferConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub model_path: PathBuf,
    pub threshold: f32,
    /// Side file the JSON report is written to.
    pub json_out: PathBuf,
}

/// Upload server configuration.
#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub threshold: f32,
    /// Directory annotated images are persisted under.
    pub output_dir: PathBuf,
}

impl InferConfig {
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut input: Option<PathBuf> = None;
        let mut output: Option<PathBuf> = None;
        let mut model_path: Option<PathBuf> = None;
        let mut threshold: Option<f32> = None;
        let mut json_out: Option<PathBuf> = None;

        let mut idx = 2;
        while idx < args.len() {
            match args[idx].as_str() {
                "--threshold" => {
                    idx += 1;
                    threshold = Some(parse_threshold(args.get(idx))?);
                    idx += 1;
                }
                "--model" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--model requires a value"))?;
                    model_path = Some(PathBuf::from(value));
                    idx += 1;
                }
                "--json-out" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--json-out requires a value"))?;
                    json_out = Some(PathBuf::from(value));
                    idx += 1;
                }
                arg if arg.starts_with('-') => bail!("Unrecognised flag: {arg}\n{INFER_USAGE}"),
                other => {
                    if input.is_none() {
                        input = Some(PathBuf::from(other));
                    } else if output.is_none() {
                        output = Some(PathBuf::from(other));
                    } else {
                        bail!("Unexpected argument: {other}\n{INFER_USAGE}");
                    }
                    idx += 1;
                }
            }
        }

        let input = input.ok_or_else(|| anyhow!("Missing input image path.\n{INFER_USAGE}"))?;
        let output = output.ok_or_else(|| anyhow!("Missing output image path.\n{INFER_USAGE}"))?;

        Ok(Self {
            input,
            output,
            model_path: model_path.unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            threshold: threshold.unwrap_or(DEFAULT_THRESHOLD),
            json_out: json_out.unwrap_or_else(|| PathBuf::from(DEFAULT_JSON_OUT)),
        })
    }
}

impl ServeConfig {
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut host = "127.0.0.1".to_owned();
        let mut port: u16 = 8000;
        let mut model_path: Option<PathBuf> = None;
        let mut threshold: Option<f32> = None;
        let mut output_dir: Option<PathBuf> = None;

        let mut idx = 2;
        while idx < args.len() {
            match args[idx].as_str() {
                "--host" => {
                    idx += 1;
                    host = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--host requires a value"))?
                        .clone();
                    idx += 1;
                }
                "--port" => {
                    idx += 1;
                    port = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--port requires a value"))?
                        .parse::<u16>()
                        .with_context(|| "--port must be an integer".to_string())?;
                    idx += 1;
                }
                "--threshold" => {
                    idx += 1;
                    threshold = Some(parse_threshold(args.get(idx))?);
                    idx += 1;
                }
                "--model" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--model requires a value"))?;
                    model_path = Some(PathBuf::from(value));
                    idx += 1;
                }
                "--output-dir" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--output-dir requires a value"))?;
                    output_dir = Some(PathBuf::from(value));
                    idx += 1;
                }
                arg => bail!("Unrecognised argument: {arg}\n{SERVE_USAGE}"),
            }
        }

        Ok(Self {
            host,
            port,
            model_path: model_path.unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            threshold: threshold.unwrap_or(DEFAULT_THRESHOLD),
            output_dir: output_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn parse_threshold(value: Option<&String>) -> Result<f32> {
    let threshold = value
        .ok_or_else(|| anyhow!("--threshold requires a value"))?
        .parse::<f32>()
        .with_context(|| "--threshold must be a number".to_string())?;
    if !(threshold > 0.0 && threshold <= 1.0) {
        bail!("--threshold must lie in (0, 1]");
    }
    Ok(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn infer_parses_positionals_and_defaults() {
        let config =
            InferConfig::from_args(&args(&["snapdetect", "infer", "cats.jpg", "out.jpg"])).unwrap();
        assert_eq!(config.input, PathBuf::from("cats.jpg"));
        assert_eq!(config.output, PathBuf::from("out.jpg"));
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.json_out, PathBuf::from(DEFAULT_JSON_OUT));
    }

    #[test]
    fn infer_accepts_threshold_flag() {
        let config = InferConfig::from_args(&args(&[
            "snapdetect",
            "infer",
            "in.jpg",
            "out.jpg",
            "--threshold",
            "0.5",
        ]))
        .unwrap();
        assert_eq!(config.threshold, 0.5);
    }

    #[test]
    fn infer_requires_both_paths() {
        assert!(InferConfig::from_args(&args(&["snapdetect", "infer", "in.jpg"])).is_err());
    }

    #[test]
    fn threshold_must_be_in_range() {
        for bad in ["0", "0.0", "1.5", "-0.1", "abc"] {
            let result = InferConfig::from_args(&args(&[
                "snapdetect",
                "infer",
                "in.jpg",
                "out.jpg",
                "--threshold",
                bad,
            ]));
            assert!(result.is_err(), "threshold {bad} should be rejected");
        }
        // Exactly 1.0 is allowed.
        assert!(InferConfig::from_args(&args(&[
            "snapdetect",
            "infer",
            "in.jpg",
            "out.jpg",
            "--threshold",
            "1.0",
        ]))
        .is_ok());
    }

    #[test]
    fn serve_defaults_and_overrides() {
        let config = ServeConfig::from_args(&args(&["snapdetect", "serve"])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);

        let config = ServeConfig::from_args(&args(&[
            "snapdetect",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--output-dir",
            "/tmp/annotated",
        ]))
        .unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/annotated"));
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(ServeConfig::from_args(&args(&["snapdetect", "serve", "--bogus"])).is_err());
    }
}
