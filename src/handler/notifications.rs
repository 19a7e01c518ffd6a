use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{dtos::caredtos::ApiResponse, error::HttpError, middleware::JWTAuthMiddeware, AppState};

#[derive(Debug, Deserialize)]
pub struct NotificationQueryDto {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn notifications_handler() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:notification_id/read", put(mark_notification_read))
        .route("/read-all", put(mark_all_notifications_read))
}

pub async fn list_notifications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<NotificationQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let notifications = app_state
        .notification_service
        .get_user_notifications(auth.user.id, limit, offset)
        .await?;

    Ok(Json(ApiResponse::ok(notifications)))
}

pub async fn mark_notification_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .notification_service
        .mark_notification_read(notification_id, auth.user.id)
        .await?;

    Ok(Json(ApiResponse::ok(serde_json::json!({ "read": true }))))
}

pub async fn mark_all_notifications_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .notification_service
        .mark_all_notifications_read(auth.user.id)
        .await?;

    Ok(Json(ApiResponse::ok(serde_json::json!({ "read": true }))))
}
