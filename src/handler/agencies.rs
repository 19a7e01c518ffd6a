use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        caredb::CareExt,
        settingsdb::{SettingsExt, DEFAULT_MAX_RADIUS_MILES, MAX_RADIUS_MILES},
    },
    dtos::caredtos::*,
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::{caremodel::AgencyProfile, usermodel::UserRole},
    service::rating_registry::RatingLookup,
    AppState,
};

pub fn agencies_handler() -> Router {
    Router::new()
        .route(
            "/profile",
            post(create_agency_profile).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Agency])
            })),
        )
        .route(
            "/profile",
            put(update_agency_profile).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Agency])
            })),
        )
        .route("/profile", get(get_my_agency_profile))
        .route("/:profile_id", get(get_agency_profile))
}

async fn clamped_radius(app_state: &AppState, requested: i32) -> Result<i32, HttpError> {
    let max_radius = app_state
        .db_client
        .get_i64_setting(MAX_RADIUS_MILES, DEFAULT_MAX_RADIUS_MILES)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))? as i32;

    Ok(requested.min(max_radius))
}

async fn decorate_with_rating(
    app_state: &AppState,
    profile: &AgencyProfile,
) -> AgencyProfileResponseDto {
    let rating = match &profile.cqc_location_id {
        Some(location_id) => match app_state
            .rating_registry
            .lookup_location_rating(location_id)
            .await
        {
            RatingLookup::Found(rating) => Some(rating),
            RatingLookup::Unavailable => None,
        },
        None => None,
    };

    AgencyProfileResponseDto::from_profile(profile, rating)
}

pub async fn create_agency_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateAgencyProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let existing = app_state
        .db_client
        .get_agency_profile_by_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    if existing.is_some() {
        return Err(HttpError::conflict(
            "Agency profile already exists".to_string(),
        ));
    }

    let radius = clamped_radius(&app_state, body.service_radius_miles).await?;

    let profile = app_state
        .db_client
        .create_agency_profile(
            auth.user.id,
            body.agency_name,
            body.cqc_provider_id,
            body.cqc_location_id,
            body.postcode,
            radius,
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(profile))))
}

pub async fn update_agency_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateAgencyProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let radius = clamped_radius(&app_state, body.service_radius_miles).await?;

    let profile = app_state
        .db_client
        .update_agency_profile(
            auth.user.id,
            body.agency_name,
            body.cqc_provider_id,
            body.cqc_location_id,
            body.postcode,
            radius,
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Agency profile not found".to_string()))?;

    Ok(Json(ApiResponse::ok(profile)))
}

pub async fn get_my_agency_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = app_state
        .db_client
        .get_agency_profile_by_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Agency profile not found".to_string()))?;

    let response = decorate_with_rating(&app_state, &profile).await;

    Ok(Json(ApiResponse::ok(response)))
}

pub async fn get_agency_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(profile_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = app_state
        .db_client
        .get_agency_profile_by_id(profile_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Agency profile not found".to_string()))?;

    let response = decorate_with_rating(&app_state, &profile).await;

    Ok(Json(ApiResponse::ok(response)))
}
