use anyhow::Result;

use crate::pipeline::{self, InferConfig, ServeConfig};

/// Dispatch the first CLI argument to a subcommand. Returns `false` when no
/// known command matched so the caller can print usage.
pub fn handle_commands(args: &[String]) -> Result<bool> {
    match args.get(1).map(|s| s.as_str()) {
        Some("infer") => {
            let config = InferConfig::from_args(args)?;
            pipeline::run_infer(config)?;
            Ok(true)
        }
        Some("serve") => {
            let config = ServeConfig::from_args(args)?;
            pipeline::run_serve(config)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

pub fn print_usage() {
    println!("snapdetect — object detection with annotated-image and JSON output");
    println!();
    println!("Commands:");
    println!("  infer <input-image> <output-image> [--threshold <0..1>] [--model <path>] [--json-out <path>]");
    println!("  serve [--host <addr>] [--port <port>] [--threshold <0..1>] [--model <path>] [--output-dir <dir>]");
}
