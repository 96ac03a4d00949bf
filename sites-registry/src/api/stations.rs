//! Station and platform-collection handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sites_common::db::{Platform, Station};

use crate::api::caller::AuthCaller;
use crate::db::stations::StationUpdate;
use crate::error::ApiResult;
use crate::services::{platforms, stations, CreatePlatformRequest, CreateStationRequest, PlatformCreated};
use crate::AppState;

/// GET /api/stations
pub async fn list_stations(
    State(state): State<AppState>,
    _caller: AuthCaller,
) -> ApiResult<Json<Vec<Station>>> {
    Ok(Json(stations::list_stations(&state.db).await?))
}

/// POST /api/stations
pub async fn create_station(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Json(request): Json<CreateStationRequest>,
) -> ApiResult<(StatusCode, Json<Station>)> {
    let station = stations::create_station(&state.db, &caller, request).await?;
    Ok((StatusCode::CREATED, Json(station)))
}

/// GET /api/stations/:id
pub async fn get_station(
    State(state): State<AppState>,
    _caller: AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Station>> {
    Ok(Json(stations::get_station(&state.db, id).await?))
}

/// PATCH /api/stations/:id
pub async fn update_station(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
    Json(update): Json<StationUpdate>,
) -> ApiResult<Json<Station>> {
    Ok(Json(
        stations::update_station(&state.db, &caller, id, update).await?,
    ))
}

/// DELETE /api/stations/:id
pub async fn delete_station(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    stations::delete_station(&state.db, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/stations/:id/platforms
pub async fn list_platforms(
    State(state): State<AppState>,
    _caller: AuthCaller,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Platform>>> {
    Ok(Json(platforms::list_platforms(&state.db, id).await?))
}

/// POST /api/stations/:id/platforms
///
/// Responds 201 even when auto-provisioned instruments failed; those
/// failures are listed under `warnings`.
pub async fn create_platform(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<i64>,
    Json(request): Json<CreatePlatformRequest>,
) -> ApiResult<(StatusCode, Json<PlatformCreated>)> {
    let created = platforms::create_platform(&state.db, &caller, id, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Build station routes
pub fn station_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stations", get(list_stations).post(create_station))
        .route(
            "/api/stations/:id",
            get(get_station).patch(update_station).delete(delete_station),
        )
        .route(
            "/api/stations/:id/platforms",
            get(list_platforms).post(create_platform),
        )
}
