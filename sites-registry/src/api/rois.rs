//! ROI lifecycle handlers

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use sites_common::db::Roi;

use crate::api::caller::AuthCaller;
use crate::db::rois::RoiUpdate;
use crate::error::ApiResult;
use crate::services::{EditModeView, LegacyTransition, MarkLegacyRequest, ReplacementChain, RoiLifecycle};
use crate::AppState;

/// GET /api/rois/:id
pub async fn get_roi(
    State(state): State<AppState>,
    _caller: AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Roi>> {
    let service = RoiLifecycle::new(state.db.clone());
    Ok(Json(service.get_roi(id).await?))
}

/// PUT /api/rois/:id
///
/// Normal in-place update; ROI editors only.
pub async fn update_roi(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
    Json(update): Json<RoiUpdate>,
) -> ApiResult<Json<Roi>> {
    let service = RoiLifecycle::new(state.db.clone());
    Ok(Json(service.update_roi(&caller, id, update).await?))
}

/// PUT /api/rois/:id/override
///
/// In-place update that flags the time series as broken.
pub async fn admin_override_update(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
    Json(update): Json<RoiUpdate>,
) -> ApiResult<Json<Roi>> {
    let service = RoiLifecycle::new(state.db.clone());
    Ok(Json(service.admin_override_update(&caller, id, update).await?))
}

/// DELETE /api/rois/:id
///
/// Soft delete; returns the archived record.
pub async fn delete_roi(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Roi>> {
    let service = RoiLifecycle::new(state.db.clone());
    Ok(Json(service.delete_roi(&caller, id).await?))
}

/// POST /api/rois/:id/legacy
pub async fn mark_as_legacy(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
    Json(request): Json<MarkLegacyRequest>,
) -> ApiResult<Json<LegacyTransition>> {
    let service = RoiLifecycle::new(state.db.clone());
    Ok(Json(service.mark_as_legacy(&caller, id, request).await?))
}

/// GET /api/rois/:id/edit-mode
pub async fn get_edit_mode(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<Json<EditModeView>> {
    let service = RoiLifecycle::new(state.db.clone());
    Ok(Json(service.get_edit_mode(&caller, id).await?))
}

/// GET /api/rois/:id/chain
pub async fn get_replacement_chain(
    State(state): State<AppState>,
    _caller: AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<Json<ReplacementChain>> {
    let service = RoiLifecycle::new(state.db.clone());
    Ok(Json(service.replacement_chain(id).await?))
}

/// Build ROI routes
pub fn roi_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/rois/:id",
            get(get_roi).put(update_roi).delete(delete_roi),
        )
        .route("/api/rois/:id/override", put(admin_override_update))
        .route("/api/rois/:id/legacy", post(mark_as_legacy))
        .route("/api/rois/:id/edit-mode", get(get_edit_mode))
        .route("/api/rois/:id/chain", get(get_replacement_chain))
}
