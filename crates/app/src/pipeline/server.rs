//! Actix Web upload endpoint exposing the pipeline over HTTP.
//!
//! `POST /upload/` accepts a single multipart file, runs the pipeline once,
//! persists the annotated JPEG server-side, and returns the report plus the
//! base64-encoded image in one JSON body. `GET /healthz` and `GET /metrics`
//! expose liveness and Prometheus metrics.

use std::{fs, path::PathBuf, sync::Arc};

use actix_multipart::Multipart;
use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures_util::StreamExt as _;
use ml_core::DetectionModel;
use serde_json::json;
use tracing::{error, info};

use crate::pipeline::{
    annotation::RandomPalette,
    config::ServeConfig,
    data::UploadResponse,
    detector::Detector,
    encoding::JPEG_QUALITY,
    error::PipelineError,
    orchestrator::run_pipeline,
    telemetry,
};

/// Shared state backing HTTP handlers.
struct ServerState {
    detector: Arc<Detector>,
    output_dir: PathBuf,
}

/// Load the model once and serve the upload endpoint until shutdown.
pub fn run_serve(config: ServeConfig) -> Result<()> {
    let _ = telemetry::init_metrics_recorder();

    let model = DetectionModel::load(&config.model_path)
        .with_context(|| format!("failed to load model from {}", config.model_path.display()))?;
    let detector = Arc::new(Detector::new(Arc::new(model), config.threshold));

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("failed to create output dir {}", config.output_dir.display())
    })?;

    let state = web::Data::new(ServerState {
        detector,
        output_dir: config.output_dir.clone(),
    });

    info!("listening on http://{}:{}", config.host, config.port);
    actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route("/upload/", web::post().to(upload_handler))
                .route("/healthz", web::get().to(health_handler))
                .route("/metrics", web::get().to(metrics_handler))
        })
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
    })?;
    Ok(())
}

/// Accept one uploaded image, run the pipeline, and answer with both
/// artifacts. Decode failures are the client's fault (400); everything else
/// is a 500. A failed invocation never returns a partial or empty report.
async fn upload_handler(mut payload: Multipart, state: web::Data<ServerState>) -> HttpResponse {
    let mut filename = String::from("upload");
    let mut bytes: Vec<u8> = Vec::new();
    let mut got_file = false;

    // Single image per request: only the first file field is consumed.
    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(err) => {
                return HttpResponse::BadRequest()
                    .json(json!({ "error": format!("malformed multipart payload: {err}") }));
            }
        };
        if let Some(name) = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
        {
            filename = name.to_owned();
        }
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(data) => bytes.extend_from_slice(&data),
                Err(err) => {
                    return HttpResponse::BadRequest()
                        .json(json!({ "error": format!("failed to read upload: {err}") }));
                }
            }
        }
        got_file = true;
        break;
    }

    if !got_file || bytes.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "no file uploaded" }));
    }

    metrics::counter!("snapdetect_uploads_total").increment(1);

    let detector = state.detector.clone();
    let result = web::block(move || {
        let mut picker = RandomPalette::default();
        run_pipeline(&detector, &bytes, &mut picker, JPEG_QUALITY)
    })
    .await;

    let output = match result {
        Ok(Ok(output)) => output,
        Ok(Err(err @ PipelineError::Decode(_))) => {
            metrics::counter!("snapdetect_upload_errors_total", "kind" => "decode").increment(1);
            return HttpResponse::BadRequest().json(json!({ "error": err.to_string() }));
        }
        Ok(Err(err)) => {
            error!("pipeline failed for upload {filename}: {err}");
            metrics::counter!("snapdetect_upload_errors_total", "kind" => "pipeline").increment(1);
            return HttpResponse::InternalServerError().json(json!({ "error": err.to_string() }));
        }
        Err(err) => {
            error!("pipeline worker failed: {err}");
            return HttpResponse::InternalServerError()
                .json(json!({ "error": "pipeline worker failed" }));
        }
    };

    let out_path = state.output_dir.join(annotated_file_name(&filename));
    if let Err(err) = fs::write(&out_path, &output.jpeg) {
        error!("failed to persist {}: {err}", out_path.display());
        return HttpResponse::InternalServerError()
            .json(json!({ "error": "failed to persist annotated image" }));
    }
    let image_path = fs::canonicalize(&out_path)
        .unwrap_or(out_path)
        .display()
        .to_string();

    HttpResponse::Ok().json(UploadResponse {
        filename,
        json_result: output.report,
        image_path,
        image_base64: BASE64.encode(&output.jpeg),
    })
}

async fn health_handler() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Prometheus exposition of the pipeline counters and histograms.
async fn metrics_handler() -> HttpResponse {
    match telemetry::prometheus_handle() {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::ServiceUnavailable().body("metrics recorder not installed"),
    }
}

/// Derive the persisted file name from the uploaded one, keeping only
/// characters safe for a local path.
fn annotated_file_name(uploaded: &str) -> String {
    let stem = std::path::Path::new(uploaded)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let safe: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        "upload_detected.jpg".to_owned()
    } else {
        format!("{safe}_detected.jpg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use image::{Rgb, RgbImage};
    use ml_core::{ModelError, PredictionSource, RawPrediction};

    struct StubSource;

    impl PredictionSource for StubSource {
        fn predict(
            &self,
            _image: &RgbImage,
            _target: (u32, u32),
        ) -> Result<Vec<RawPrediction>, ModelError> {
            Ok(vec![RawPrediction {
                score: 0.95,
                class_id: 17,
                bbox: [4.0, 4.0, 20.0, 20.0],
            }])
        }

        fn label(&self, class_id: u32) -> Option<&str> {
            ml_core::labels::label(class_id)
        }
    }

    fn test_state() -> web::Data<ServerState> {
        web::Data::new(ServerState {
            detector: Arc::new(Detector::new(Arc::new(StubSource), 0.9)),
            output_dir: std::env::temp_dir(),
        })
    }

    fn multipart_body(filename: &str, payload: &[u8]) -> (String, Vec<u8>) {
        let boundary = "----snapdetect-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (
            format!("multipart/form-data; boundary={boundary}"),
            body,
        )
    }

    fn png_bytes() -> Vec<u8> {
        let image = RgbImage::from_pixel(32, 32, Rgb([80, 80, 80]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[actix_web::test]
    async fn upload_returns_report_and_base64_image() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .route("/upload/", web::post().to(upload_handler)),
        )
        .await;

        let (content_type, body) = multipart_body("cats.jpg", &png_bytes());
        let request = test::TestRequest::post()
            .uri("/upload/")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let response: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(response["filename"], "cats.jpg");
        assert_eq!(response["json_result"]["Detected Objects"][0]["label"], "cat");
        assert!(response["image_path"].as_str().unwrap().ends_with("cats_detected.jpg"));

        let jpeg = BASE64
            .decode(response["image_base64"].as_str().unwrap())
            .unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 32);
    }

    #[actix_web::test]
    async fn non_image_upload_is_a_client_error() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .route("/upload/", web::post().to(upload_handler)),
        )
        .await;

        let (content_type, body) = multipart_body("junk.bin", b"not an image at all");
        let request = test::TestRequest::post()
            .uri("/upload/")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    // `use actix_web::test` above shadows the built-in `#[test]` attribute,
    // so name it explicitly.
    #[::core::prelude::v1::test]
    fn file_names_are_sanitized() {
        assert_eq!(annotated_file_name("cats.jpg"), "cats_detected.jpg");
        assert_eq!(annotated_file_name("../../etc/passwd"), "passwd_detected.jpg");
        assert_eq!(annotated_file_name("?!*"), "upload_detected.jpg");
    }
}
