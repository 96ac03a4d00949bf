//! Instrument and ROI-collection handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sites_common::db::{Instrument, Roi};

use crate::api::caller::AuthCaller;
use crate::db::instruments::InstrumentUpdate;
use crate::error::ApiResult;
use crate::services::{instruments, CreateRoiRequest, RoiLifecycle};
use crate::AppState;

/// Query parameters for instrument deletion
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Remove the instrument's ROIs (any state) together with it
    #[serde(default)]
    pub cascade: bool,
}

/// Query parameters for ROI listing
#[derive(Debug, Deserialize)]
pub struct RoiListQuery {
    /// Include legacy and archived ROIs
    #[serde(default)]
    pub include_legacy: bool,
}

/// GET /api/instruments/:id
pub async fn get_instrument(
    State(state): State<AppState>,
    _caller: AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Instrument>> {
    Ok(Json(instruments::get_instrument(&state.db, id).await?))
}

/// PATCH /api/instruments/:id
pub async fn update_instrument(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
    Json(update): Json<InstrumentUpdate>,
) -> ApiResult<Json<Instrument>> {
    Ok(Json(
        instruments::update_instrument(&state.db, &caller, id, update).await?,
    ))
}

/// DELETE /api/instruments/:id?cascade=true
pub async fn delete_instrument(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<StatusCode> {
    instruments::delete_instrument(&state.db, &caller, id, query.cascade).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/instruments/:id/rois?include_legacy=true
pub async fn list_rois(
    State(state): State<AppState>,
    _caller: AuthCaller,
    Path(id): Path<i64>,
    Query(query): Query<RoiListQuery>,
) -> ApiResult<Json<Vec<Roi>>> {
    let service = RoiLifecycle::new(state.db.clone());
    Ok(Json(service.list_rois(id, query.include_legacy).await?))
}

/// POST /api/instruments/:id/rois
pub async fn create_roi(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
    Json(request): Json<CreateRoiRequest>,
) -> ApiResult<(StatusCode, Json<Roi>)> {
    let service = RoiLifecycle::new(state.db.clone());
    let roi = service.create_roi(&caller, id, request).await?;
    Ok((StatusCode::CREATED, Json(roi)))
}

/// Build instrument routes
pub fn instrument_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/instruments/:id",
            get(get_instrument)
                .patch(update_instrument)
                .delete(delete_instrument),
        )
        .route("/api/instruments/:id/rois", get(list_rois).post(create_roi))
}
