//! Platform and instrument-collection handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sites_common::db::{Instrument, Platform};

use crate::api::caller::AuthCaller;
use crate::db::platforms::PlatformUpdate;
use crate::error::ApiResult;
use crate::services::{instruments, platforms, CreateInstrumentRequest};
use crate::AppState;

/// GET /api/platforms/:id
pub async fn get_platform(
    State(state): State<AppState>,
    _caller: AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Platform>> {
    Ok(Json(platforms::get_platform(&state.db, id).await?))
}

/// PATCH /api/platforms/:id
pub async fn update_platform(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
    Json(update): Json<PlatformUpdate>,
) -> ApiResult<Json<Platform>> {
    Ok(Json(
        platforms::update_platform(&state.db, &caller, id, update).await?,
    ))
}

/// DELETE /api/platforms/:id
///
/// 409 while the platform still has instruments.
pub async fn delete_platform(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    platforms::delete_platform(&state.db, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/platforms/:id/instruments
pub async fn list_instruments(
    State(state): State<AppState>,
    _caller: AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Instrument>>> {
    Ok(Json(instruments::list_instruments(&state.db, id).await?))
}

/// POST /api/platforms/:id/instruments
pub async fn create_instrument(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
    Json(request): Json<CreateInstrumentRequest>,
) -> ApiResult<(StatusCode, Json<Instrument>)> {
    let instrument = instruments::create_instrument(&state.db, &caller, id, request).await?;
    Ok((StatusCode::CREATED, Json(instrument)))
}

/// Build platform routes
pub fn platform_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/platforms/:id",
            get(get_platform).patch(update_platform).delete(delete_platform),
        )
        .route(
            "/api/platforms/:id/instruments",
            get(list_instruments).post(create_instrument),
        )
}
