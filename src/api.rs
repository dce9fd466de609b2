//! HTTP endpoints for handovers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use uuid::Uuid;

use crate::error::Result;
use crate::handover::HandoverView;
use crate::identity::Identity;
use crate::models::{CreateHandoverRequest, DecisionRequest, HandoverResponse};
use crate::AppState;

/// JSON body whose rejection is reported as a field validation error
type Body<T> = std::result::Result<Json<T>, JsonRejection>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/handovers", get(list_handovers).post(create_handover))
        .route("/handovers/:id", get(get_handover))
        .route("/handovers/:id/approve-hod", put(approve_hod))
        .route("/handovers/:id/approve-faculty", put(approve_faculty))
        .route("/handovers/:id/decision", put(decide))
}

async fn create_handover(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    payload: Body<CreateHandoverRequest>,
) -> Result<(StatusCode, Json<HandoverResponse>)> {
    let Json(payload) = payload?;
    let created = state.service.create(payload, &identity).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_handovers(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<HandoverView>> {
    Ok(Json(state.service.list_for(&identity).await?))
}

async fn get_handover(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<HandoverResponse>> {
    Ok(Json(state.service.get_for(id, &identity).await?))
}

async fn approve_hod(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    request: Body<DecisionRequest>,
) -> Result<Json<HandoverResponse>> {
    let Json(request) = request?;
    Ok(Json(state.service.decide_head(id, &identity, request).await?))
}

async fn approve_faculty(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    request: Body<DecisionRequest>,
) -> Result<Json<HandoverResponse>> {
    let Json(request) = request?;
    Ok(Json(
        state.service.decide_receiver(id, &identity, request).await?,
    ))
}

async fn decide(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    request: Body<DecisionRequest>,
) -> Result<Json<HandoverResponse>> {
    let Json(request) = request?;
    Ok(Json(state.service.decide(id, &identity, request).await?))
}
