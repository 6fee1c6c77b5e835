use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod cache;
mod config;
mod fetch;
mod metrics;
mod pipeline;
mod views;

use cache::{ArtifactCache, CacheStats};
use config::AppConfig;
use fetch::{RcsbClient, normalize_structure_id};
use metrics::{Metrics, MetricsSnapshot};
use pipeline::LoaderPipeline;
use store::ArtifactStore;
use views::{ViewRecord, ViewStore};

struct AppState {
    pipeline: LoaderPipeline<RcsbClient>,
    views: ViewStore,
    cache: ArtifactCache,
    metrics: Arc<Metrics>,
    store: ArtifactStore,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: String,
}

#[derive(Serialize)]
struct StatsResponse {
    metrics: MetricsSnapshot,
    cache: CacheStats,
}

#[derive(Deserialize)]
struct DeleteViewRequest {
    pdb_id: String,
    id: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = AppConfig::default();

    let store = ArtifactStore::new(&config.storage.artifact_root);
    let cache = ArtifactCache::new(config.cache.enabled, config.cache.max_entries);
    let metrics = Metrics::new();
    let source = RcsbClient::new(
        config.source.base_url.clone(),
        config.source.deadline_secs,
        config.source.max_content_len,
    );
    let pipeline = LoaderPipeline::new(
        source,
        store.clone(),
        cache.clone(),
        metrics.clone(),
    );

    let state = Arc::new(AppState {
        pipeline,
        views: ViewStore::new(&config.storage.view_root),
        cache,
        metrics,
        store,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/pdb/:file", get(structure_loader))
        .route("/views/:pdb_id", get(list_views))
        .route("/views", post(save_view))
        .route("/views/delete", post(delete_view))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .unwrap();

    tracing::info!(addr = %config.server.bind_addr, "server listening");

    axum::serve(listener, app).await.unwrap();
}

/// The artifact read path: `/pdb/1MBO.js` serves the loader text for 1MBO,
/// computing and persisting it on first request. Diagnostics come back as
/// comment bodies the viewer renders inline.
async fn structure_loader(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let raw_id = file.strip_suffix(".js").unwrap_or(&file);
    let structure_id = normalize_structure_id(raw_id).ok_or(StatusCode::BAD_REQUEST)?;

    match state.pipeline.get_loader(&structure_id).await {
        Ok(reply) => Ok((
            [(header::CONTENT_TYPE, "application/javascript")],
            reply.into_text(),
        )),
        Err(error) => {
            state.metrics.record_hard_failure();
            tracing::error!(%structure_id, error = %error, "loader pipeline failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn list_views(
    State(state): State<Arc<AppState>>,
    Path(pdb_id): Path<String>,
) -> Result<Json<Vec<ViewRecord>>, StatusCode> {
    let pdb_id = normalize_structure_id(&pdb_id).ok_or(StatusCode::BAD_REQUEST)?;
    let views = state.views.list(&pdb_id).await.map_err(|error| {
        tracing::error!(%pdb_id, error = %error, "failed to list views");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(views))
}

async fn save_view(
    State(state): State<Arc<AppState>>,
    Json(mut view): Json<ViewRecord>,
) -> Result<Json<ViewRecord>, StatusCode> {
    view.pdb_id = normalize_structure_id(&view.pdb_id).ok_or(StatusCode::BAD_REQUEST)?;
    let saved = state.views.save(view).await.map_err(|error| {
        tracing::warn!(error = %error, "failed to save view");
        StatusCode::BAD_REQUEST
    })?;
    Ok(Json(saved))
}

async fn delete_view(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteViewRequest>,
) -> Result<StatusCode, StatusCode> {
    let pdb_id = normalize_structure_id(&req.pdb_id).ok_or(StatusCode::BAD_REQUEST)?;
    let removed = state.views.delete(&pdb_id, &req.id).await.map_err(|error| {
        tracing::warn!(%pdb_id, error = %error, "failed to delete view");
        StatusCode::BAD_REQUEST
    })?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store_status = match tokio::fs::create_dir_all(state.store.root()).await {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {e}"),
    };
    Json(HealthResponse {
        status: "ok",
        store: store_status,
    })
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        metrics: state.metrics.snapshot(),
        cache: state.cache.stats(),
    })
}
