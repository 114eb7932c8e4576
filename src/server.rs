use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::charts::{ChartKind, ChartRenderer, Charts, RenderError, SvgChartRenderer};
use crate::clinical::{BuiltinClinicalInfo, ClinicalInfo, ClinicalInfoStore};
use crate::config::Config;
use crate::labels::{LabelTable, Organ, OrganGroups};
use crate::model::{InferenceEngine, InferenceError};
use crate::preprocess::{DecodeError, ImageDecoder, RgbImageDecoder};
use crate::report::{
    build_report, Alternative, ConfidenceMap, Prediction, PredictionReport, ReportError,
    VisualizationSummary,
};

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "tiff"];

/// Everything a request needs. Read-only once built.
pub struct AppState {
    pub config: Config,
    pub labels: LabelTable,
    pub organs: OrganGroups,
    pub clinical: Arc<dyn ClinicalInfoStore>,
    pub decoder: Arc<dyn ImageDecoder>,
    pub engine: Arc<dyn InferenceEngine>,
    pub renderer: Arc<dyn ChartRenderer>,
    permits: Arc<Semaphore>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Standard label table, built-in clinical texts, RGB decoder and SVG charts.
    pub fn new(config: Config, engine: Arc<dyn InferenceEngine>) -> Self {
        let labels = LabelTable::standard();
        let organs = OrganGroups::from_table(&labels);
        let permits = Arc::new(Semaphore::new(config.max_concurrent_predictions));

        Self {
            config,
            labels,
            organs,
            clinical: Arc::new(BuiltinClinicalInfo::new()),
            decoder: Arc::new(RgbImageDecoder),
            engine,
            renderer: Arc::new(SvgChartRenderer::default()),
            permits,
        }
    }

    /// Decode, classify, report and draw. Blocking; runs off the async runtime.
    pub fn analyze(&self, image_path: &Path) -> Result<(PredictionReport, Charts), ApiError> {
        let tensor = self
            .decoder
            .load_and_normalize(image_path, self.config.target_size())?;
        let probabilities = self.engine.predict(&tensor)?;
        let report = build_report(
            &probabilities,
            &self.labels,
            &self.organs,
            self.clinical.as_ref(),
        )?;
        let charts = self.renderer.render(&report.summary)?;
        Ok((report, charts))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No image provided")]
    NoImage,
    #[error("No selected file")]
    NoSelectedFile,
    #[error("File type not allowed")]
    FileTypeNotAllowed,
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status = match self {
            ApiError::NoImage | ApiError::NoSelectedFile | ApiError::FileTypeNotAllowed => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Multipart(err) => err.into_response().status(),
            _ => {
                error!(error = %message, "prediction failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub organ: Organ,
    pub is_malignant: bool,
}

/// Stored chart file names, relative to `/visualizations/`.
#[derive(Debug, Serialize)]
pub struct Visualizations {
    pub bar_chart: String,
    pub organ_chart: String,
    pub pie_chart: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: Prediction,
    pub all_confidences: ConfidenceMap,
    pub filename: String,
    pub meta: Meta,
    pub cancer_info: ClinicalInfo,
    pub alternatives_info: Vec<Alternative>,
    pub visualizations: Visualizations,
    pub summary: VisualizationSummary,
}

impl PredictResponse {
    fn new(report: PredictionReport, filename: String, visualizations: Visualizations) -> Self {
        Self {
            meta: Meta {
                organ: report.prediction.organ,
                is_malignant: report.is_malignant,
            },
            prediction: report.prediction,
            all_confidences: report.confidences,
            filename,
            cancer_info: report.clinical_info,
            alternatives_info: report.alternatives,
            visualizations,
            summary: report.summary,
        }
    }
}

pub fn router(state: SharedState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);
    let charts = ServeDir::new(&state.config.visualization_dir);

    Router::new()
        .route("/api/predict", post(predict_handler))
        .route("/api/health", get(health_check))
        .nest_service("/uploads", uploads)
        .nest_service("/visualizations", charts)
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Lower-cased extension if it is on the allow-list.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            // a plain form value is not a file upload
            let file_name = field.file_name().ok_or(ApiError::NoImage)?.to_string();
            let bytes = field.bytes().await?.to_vec();
            return Ok(Upload { file_name, bytes });
        }
    }
    Err(ApiError::NoImage)
}

#[instrument(skip_all)]
async fn predict_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    if upload.file_name.is_empty() {
        return Err(ApiError::NoSelectedFile);
    }
    let extension = allowed_extension(&upload.file_name).ok_or(ApiError::FileTypeNotAllowed)?;

    let id = Uuid::new_v4().to_string();
    let filename = format!("{}.{}", id, extension);
    let upload_path: PathBuf = state.config.upload_dir.join(&filename);
    tokio::fs::write(&upload_path, &upload.bytes).await?;
    info!(%filename, bytes = upload.bytes.len(), "upload stored");

    // The permit moves into the blocking task so it outlives a dropped request.
    let permit = state
        .permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let worker = state.clone();
    let (report, charts) = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        worker.analyze(&upload_path)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let visualizations = store_charts(&state, &id, &charts).await?;
    info!(
        class = %report.prediction.label,
        confidence = report.prediction.confidence,
        "prediction complete"
    );

    Ok(Json(PredictResponse::new(report, filename, visualizations)))
}

async fn store_charts(
    state: &AppState,
    id: &str,
    charts: &Charts,
) -> Result<Visualizations, ApiError> {
    let name_for = |kind: ChartKind| {
        format!(
            "{}_{}.{}",
            id,
            kind.file_suffix(),
            state.renderer.extension()
        )
    };

    for kind in ChartKind::ALL {
        let path = state.config.visualization_dir.join(name_for(kind));
        tokio::fs::write(path, charts.get(kind)).await?;
    }

    Ok(Visualizations {
        bar_chart: name_for(ChartKind::BarChart),
        organ_chart: name_for(ChartKind::OrganChart),
        pie_chart: name_for(ChartKind::PieChart),
    })
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "model_loaded": true }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::preprocess::{tests::png_bytes, ImageTensor};

    struct StubEngine(Vec<f32>);

    impl InferenceEngine for StubEngine {
        fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
            assert_eq!(input.data.len(), 224 * 224 * 3);
            Ok(self.0.clone())
        }
    }

    fn one_hot(index: usize) -> Vec<f32> {
        let mut values = vec![0.0; 27];
        values[index] = 1.0;
        values
    }

    #[derive(Default)]
    struct SlowEngine {
        running: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl InferenceEngine for SlowEngine {
        fn predict(&self, _input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(400));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(one_hot(0))
        }
    }

    struct FixedRenderer;

    impl ChartRenderer for FixedRenderer {
        fn extension(&self) -> &'static str {
            "png"
        }

        fn render(&self, _summary: &VisualizationSummary) -> Result<Charts, RenderError> {
            Ok(Charts {
                bar_chart: b"bar".to_vec(),
                organ_chart: b"organ".to_vec(),
                pie_chart: b"pie".to_vec(),
            })
        }
    }

    fn test_state(engine: Arc<dyn InferenceEngine>) -> (AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            upload_dir: dir.path().join("uploads"),
            visualization_dir: dir.path().join("visualizations"),
            body_limit_bytes: 64 * 1024,
            ..Config::default()
        };
        std::fs::create_dir_all(&config.upload_dir).unwrap();
        std::fs::create_dir_all(&config.visualization_dir).unwrap();

        (AppState::new(config, engine), dir)
    }

    fn app(output: Vec<f32>) -> (Router, TempDir) {
        let (state, dir) = test_state(Arc::new(StubEngine(output)));
        (router(Arc::new(state)), dir)
    }

    fn multipart_request(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
        part_request(
            &format!("name=\"{field}\"; filename=\"{file_name}\""),
            bytes,
        )
    }

    fn part_request(disposition: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "histopathboundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; {disposition}\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/predict")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn extension_allow_list() {
        assert_eq!(allowed_extension("scan.PNG").as_deref(), Some("png"));
        assert_eq!(allowed_extension("a.b.tiff").as_deref(), Some("tiff"));
        assert_eq!(allowed_extension("scan.gif"), None);
        assert_eq!(allowed_extension("scan"), None);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _dir) = app(one_hot(0));
        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_json(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "model_loaded": true }));
    }

    #[tokio::test]
    async fn missing_image_field_is_rejected() {
        let (app, _dir) = app(one_hot(0));
        let (status, body) =
            send_json(&app, multipart_request("file", "scan.png", &png_bytes(4, 4))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image provided");
    }

    #[tokio::test]
    async fn empty_filename_is_rejected() {
        let (app, _dir) = app(one_hot(0));
        let (status, body) = send_json(&app, multipart_request("image", "", b"")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No selected file");
    }

    #[tokio::test]
    async fn image_field_without_filename_is_missing_image() {
        let (app, _dir) = app(one_hot(0));
        let (status, body) = send_json(&app, part_request("name=\"image\"", b"scan")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image provided");
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected() {
        let (app, _dir) = app(one_hot(0));
        let (status, body) =
            send_json(&app, multipart_request("image", "scan.gif", &png_bytes(4, 4))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "File type not allowed");
    }

    #[tokio::test]
    async fn oversized_upload_is_a_client_error() {
        let (app, _dir) = app(one_hot(0));
        let big = vec![0u8; 128 * 1024];
        let (status, _) = send(&app, multipart_request("image", "scan.png", &big)).await;

        assert!(status.is_client_error(), "got {status}");
    }

    #[tokio::test]
    async fn predict_returns_report_and_serves_charts() {
        let (app, dir) = app(one_hot(5));
        let (status, body) =
            send_json(&app, multipart_request("image", "Scan.JPG", &png_bytes(6, 4))).await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["prediction"]["class"], "brain_menin");
        assert_eq!(body["prediction"]["confidence"], 1.0);
        assert_eq!(body["prediction"]["readable_name"], "Brain Meningioma");
        assert_eq!(body["prediction"]["organ"], "Brain");
        assert_eq!(body["meta"]["organ"], "Brain");
        assert_eq!(body["meta"]["is_malignant"], true);
        assert_eq!(body["all_confidences"].as_object().unwrap().len(), 27);
        assert_eq!(body["alternatives_info"].as_array().unwrap().len(), 3);
        assert!(body["cancer_info"]["description"]
            .as_str()
            .unwrap()
            .contains("meninges"));

        let filename = body["filename"].as_str().unwrap();
        assert!(filename.ends_with(".jpg"));
        assert!(dir.path().join("uploads").join(filename).is_file());

        let id = filename.trim_end_matches(".jpg");
        let bar = body["visualizations"]["bar_chart"].as_str().unwrap();
        assert_eq!(bar, format!("{id}_bar.svg"));
        assert_eq!(
            body["visualizations"]["pie_chart"],
            format!("{id}_pie.svg")
        );

        let request = Request::builder()
            .uri(format!("/visualizations/{bar}"))
            .body(Body::empty())
            .unwrap();
        let (status, svg) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(svg).unwrap().contains("<svg"));

        let request = Request::builder()
            .uri(format!("/uploads/{filename}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn chart_names_follow_renderer_extension() {
        let (mut state, dir) = test_state(Arc::new(StubEngine(one_hot(0))));
        state.renderer = Arc::new(FixedRenderer);
        let app = router(Arc::new(state));

        let (status, body) =
            send_json(&app, multipart_request("image", "scan.png", &png_bytes(4, 4))).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let organ = body["visualizations"]["organ_chart"].as_str().unwrap();
        assert!(organ.ends_with("_organ.png"), "{organ}");
        let stored = std::fs::read(dir.path().join("visualizations").join(organ)).unwrap();
        assert_eq!(stored, b"organ");
    }

    #[tokio::test]
    async fn dropped_request_keeps_its_inference_slot() {
        let engine = Arc::new(SlowEngine::default());
        let (state, _dir) = test_state(engine.clone());
        assert_eq!(state.config.max_concurrent_predictions, 1);
        let app = router(Arc::new(state));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            send(&app, multipart_request("image", "first.png", &png_bytes(4, 4))),
        )
        .await;
        assert!(abandoned.is_err());

        let second = multipart_request("image", "second.png", &png_bytes(4, 4));
        let (status, _) = send(&app, second).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undecodable_image_is_a_server_error() {
        let (app, _dir) = app(one_hot(0));
        let (status, body) =
            send_json(&app, multipart_request("image", "scan.png", b"definitely not png")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("failed to decode image"));
    }

    #[tokio::test]
    async fn engine_output_length_mismatch_is_a_server_error() {
        let (app, _dir) = app(vec![0.5; 26]);
        let (status, body) =
            send_json(&app, multipart_request("image", "scan.png", &png_bytes(4, 4))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "probability vector has 26 values but the label table has 27"
        );
    }
}
