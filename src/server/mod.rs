use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::catalog::{self, FieldDef};
use crate::pipeline::Pipeline;
use crate::wire::{ApiResponse, SectionKind};

#[derive(Serialize)]
struct QuestionsResponse {
    section: String,
    fields: &'static [FieldDef],
}

async fn generate(State(pipeline): State<Arc<Pipeline>>, body: Bytes) -> (StatusCode, Json<ApiResponse>) {
    let (status, resp) = pipeline.handle(&body).await;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(resp))
}

async fn questions(Path(id): Path<String>) -> Json<QuestionsResponse> {
    let kind = SectionKind::parse(&id);
    Json(QuestionsResponse { section: kind.to_string(), fields: catalog::questions_for(&kind) })
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/sections/:id/questions", get(questions))
        .with_state(pipeline)
}

pub async fn serve(pipeline: Arc<Pipeline>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("could not bind {bind}"))?;
    tracing::info!(addr = %listener.local_addr()?, demo = pipeline.config().demo_mode, "listening");
    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
