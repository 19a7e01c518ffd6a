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
    dtos::caredtos::*,
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    service::timesheet_service::RespondMode,
    AppState,
};

pub fn timesheets_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(submit_timesheet).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Agency])
            })),
        )
        .route("/job/:job_id", get(list_timesheets))
        .route(
            "/:timesheet_id/approve",
            put(approve_timesheet).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Customer, UserRole::Admin])
            })),
        )
        .route(
            "/:timesheet_id/query",
            post(query_timesheet).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Customer, UserRole::Admin])
            })),
        )
        .route(
            "/:timesheet_id/respond",
            post(respond_to_query).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Agency])
            })),
        )
}

pub async fn submit_timesheet(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<SubmitTimesheetDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let timesheet = app_state
        .timesheet_service
        .submit_timesheet(
            auth.user.id,
            body.job_id,
            body.week_starting,
            body.hours_worked,
            body.notes,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(timesheet))))
}

pub async fn list_timesheets(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let timesheets = app_state
        .timesheet_service
        .list_timesheets(auth.user.id, job_id)
        .await?;

    Ok(Json(ApiResponse::ok(timesheets)))
}

pub async fn approve_timesheet(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(timesheet_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let timesheet = app_state
        .timesheet_service
        .approve_timesheet(auth.user.id, timesheet_id)
        .await?;

    Ok(Json(ApiResponse::ok(timesheet)))
}

pub async fn query_timesheet(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(timesheet_id): Path<Uuid>,
    Json(body): Json<QueryTimesheetDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let timesheet = app_state
        .timesheet_service
        .query_timesheet(auth.user.id, timesheet_id, body.query_note, body.suggested_hours)
        .await?;

    Ok(Json(ApiResponse::ok(timesheet)))
}

pub async fn respond_to_query(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(timesheet_id): Path<Uuid>,
    Json(body): Json<RespondTimesheetDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let mode = RespondMode::parse(&body.mode)?;

    let timesheet = app_state
        .timesheet_service
        .respond_to_query(
            auth.user.id,
            timesheet_id,
            body.response_note,
            mode,
            body.adjusted_hours,
        )
        .await?;

    Ok(Json(ApiResponse::ok(timesheet)))
}
