//! File-backed development server for the consumed REST contract. It exists
//! so the sync bridge has something real to talk to during development and
//! tests; it is a harness, not a persistence engine.

use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path as UrlPath, State},
    http::StatusCode,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};

use crate::store::ProgressData;
use crate::sync::NodeInteraction;
use crate::tree::SkillTreeDef;

#[derive(Clone)]
pub struct ApiState {
    def: Arc<SkillTreeDef>,
    progress: Arc<Mutex<ProgressData>>,
    progress_path: PathBuf,
}

impl ApiState {
    pub fn new(def: SkillTreeDef, progress_path: PathBuf) -> Self {
        let progress = load_progress(&progress_path).unwrap_or_default();
        Self {
            def: Arc::new(def),
            progress: Arc::new(Mutex::new(progress)),
            progress_path,
        }
    }
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/skill-progress", get(get_progress).post(post_progress))
        .route("/api/node/:id", get(node_interaction))
        .with_state(state)
        .layer(cors)
}

pub fn resolve_api_addr<F>(mut get_env: F) -> SocketAddr
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(addr) = get_env("MEDPHYS_API_ADDR").and_then(|v| v.parse().ok()) {
        return addr;
    }

    if let Some(port) = get_env("MEDPHYS_API_PORT").and_then(|v| v.parse::<u16>().ok()) {
        return SocketAddr::from(([127, 0, 0, 1], port));
    }

    "127.0.0.1:4000"
        .parse()
        .expect("default api listen addr should parse")
}

pub fn default_progress_path() -> PathBuf {
    if let Ok(p) = std::env::var("MEDPHYS_PROGRESS_PATH") {
        return PathBuf::from(p);
    }

    // `CARGO_MANIFEST_DIR` is `.../game`; the workspace `target/` lives at `..`.
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("target")
        .join("skill_progress.json")
}

async fn health() -> &'static str {
    "ok"
}

async fn get_progress(State(state): State<ApiState>) -> Json<ProgressData> {
    let progress = state
        .progress
        .lock()
        .expect("progress lock should be available");
    Json(progress.clone())
}

async fn post_progress(
    State(state): State<ApiState>,
    Json(payload): Json<ProgressData>,
) -> Result<StatusCode, (StatusCode, String)> {
    {
        let mut progress = state
            .progress
            .lock()
            .expect("progress lock should be available");
        *progress = payload.clone();
    }

    save_progress(&state.progress_path, &payload).map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to persist progress: {err}"),
        )
    })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn node_interaction(
    State(state): State<ApiState>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<NodeInteraction>, StatusCode> {
    let node = state
        .def
        .nodes
        .iter()
        .find(|n| n.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(NodeInteraction::Event {
        description: if node.description.is_empty() {
            node.name.clone()
        } else {
            node.description.clone()
        },
    }))
}

fn load_progress(path: &Path) -> Option<ProgressData> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn save_progress(path: &Path, progress: &ProgressData) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let json = serde_json::to_string_pretty(progress).unwrap_or_else(|_| "{}".to_string());
    atomic_write(path, json.as_bytes())
}

fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    match fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            // Best-effort fallback for Windows rename semantics (rename over an existing file can fail).
            fs::copy(&tmp, path)?;
            let _ = fs::remove_file(&tmp);
            Ok(())
        }
    }
}
