use std::sync::Arc;

use axum::{
    extract::Path,
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use validator::Validate;

use uuid::Uuid;

use crate::{
    db::{
        caredb::CareExt,
        settingsdb::{self, SettingsExt},
    },
    dtos::caredtos::*,
    error::HttpError,
    middleware::role_check,
    models::usermodel::UserRole,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/settings", get(list_settings))
        .route("/settings/:key", put(update_setting))
        .route("/payments/:payment_id/paid", put(mark_payment_paid))
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
}

pub async fn list_settings(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let settings = app_state
        .db_client
        .list_settings()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::ok(settings)))
}

pub async fn update_setting(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(key): Path<String>,
    Json(body): Json<UpdateSettingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if !settingsdb::is_recognized_key(&key) {
        return Err(HttpError::bad_request(format!(
            "Unknown setting key '{}'",
            key
        )));
    }

    if key == settingsdb::QUERY_EXPIRY_ACTION
        && !matches!(body.value.as_str(), "off" | "auto_settle")
    {
        return Err(HttpError::bad_request(
            "query_expiry_action must be 'off' or 'auto_settle'".to_string(),
        ));
    }

    let setting = app_state
        .db_client
        .upsert_setting(&key, &body.value)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("App setting {} updated to {}", setting.key, setting.value);

    Ok(Json(ApiResponse::ok(setting)))
}

/// Marks a recorded payment as paid out once the transfer has cleared.
pub async fn mark_payment_paid(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .db_client
        .mark_payment_paid(payment_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| {
            HttpError::not_found("Payment not found or already paid".to_string())
        })?;

    Ok(Json(ApiResponse::ok(payment)))
}
