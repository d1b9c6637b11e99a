use axum::{
    Router,
    body::Bytes,
    extract::{Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::stub::{RecordedResearch, RecordedUpload, Recorder, Reply, StubBackend};

const ALLOWED_EXTENSION: &str = "docx";

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<StubBackend>,
    pub recorder: Recorder,
}

pub fn create_app(backend: StubBackend) -> (Router, Recorder) {
    let recorder = Recorder::default();
    let app_state = AppState {
        backend: Arc::new(backend),
        recorder: recorder.clone(),
    };
    (build_router(app_state), recorder)
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/api/upload", post(upload_file))
        .route("/api/research/{drug_name}", get(search_research))
        .route("/api/export/pdf", post(export_pdf))
        .route("/api/download/{filename}", get(download_file))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            count_requests,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.recorder.record_request();
    next.run(request).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Protocol Analyzer stub backend",
        "endpoints": {
            "POST /api/upload": "Analyze a DOCX protocol (multipart field `file`)",
            "GET /api/research/{drug_name}": "Literature lookup, optional `condition` query",
            "POST /api/export/pdf": "Export an analysis result to PDF",
            "GET /api/download/{filename}": "Download a generated report",
            "GET /api/health": "Health check"
        }
    }))
}

async fn health_check(State(state): State<AppState>) -> Response {
    state.backend.health.clone().into_response()
}

async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some(RecordedUpload {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        })
                    }
                    Err(e) => return bad_request(&format!("Некорректный запрос: {e}")),
                }
            }
            Ok(None) => break,
            Err(e) => return bad_request(&format!("Некорректный запрос: {e}")),
        }
    }

    let Some(upload) = upload else {
        return bad_request("Файл не найден");
    };
    state.recorder.record_upload(upload.clone());

    let file_name = upload.file_name.unwrap_or_default();
    info!("Received {} ({} bytes)", file_name, upload.bytes.len());

    if file_name.is_empty() {
        return bad_request("Файл не выбран");
    }
    if !allowed_file(&file_name) {
        return bad_request("Разрешены только DOCX файлы");
    }

    state.backend.upload.clone().into_response()
}

/// Server-side gate: any letter case, as long as there is a `.docx` suffix.
fn allowed_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(ALLOWED_EXTENSION))
}

async fn search_research(
    State(state): State<AppState>,
    Path(drug_name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    info!("Research lookup for {}", drug_name);
    state.recorder.record_research(RecordedResearch {
        drug_name,
        condition: params.get("condition").cloned(),
    });
    state.backend.research.clone().into_response()
}

async fn export_pdf(State(state): State<AppState>, body: Bytes) -> Response {
    let data = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(map)) if !map.is_empty() => Value::Object(map),
        _ => return bad_request("Данные для экспорта не найдены"),
    };

    state.recorder.record_export(data);
    state.backend.export.clone().into_response()
}

async fn download_file(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    if filename.starts_with('.') || filename.contains(['/', '\\']) {
        warn!("Refusing download of {}", filename);
        return not_found();
    }

    match state.backend.downloads.get(&filename) {
        Some(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            bytes.clone(),
        )
            .into_response(),
        None => not_found(),
    }
}

fn bad_request(message: &str) -> Response {
    Reply::error(StatusCode::BAD_REQUEST, message).into_response()
}

fn not_found() -> Response {
    Reply::error(StatusCode::NOT_FOUND, "Файл не найден").into_response()
}
