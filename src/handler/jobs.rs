use std::sync::Arc;

use axum::{
    extract::Path,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    dtos::caredtos::*,
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn jobs_handler() -> Router {
    Router::new()
        .route("/", get(list_jobs))
        .route("/:job_id", get(get_job))
        .route("/:job_id/contract", get(get_job_contract))
        .route("/contracts/:contract_id/sign", put(sign_contract))
        .route(
            "/:job_id/assessment",
            put(mark_assessment_complete).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Agency])
            })),
        )
        .route(
            "/:job_id/start-date",
            put(set_start_date).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Agency])
            })),
        )
        .route("/:job_id/confirm", post(confirm_care))
        .route("/:job_id/decline", post(decline_care))
        .route("/:job_id/cancel", post(cancel_pre_care))
        .route(
            "/:job_id/pause",
            put(pause_job).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Agency, UserRole::Admin])
            })),
        )
        .route(
            "/:job_id/resume",
            put(resume_job).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Agency, UserRole::Admin])
            })),
        )
        .route("/:job_id/payments", get(list_payments))
}

pub async fn list_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.job_service.list_jobs(auth.user.id).await?;

    Ok(Json(ApiResponse::ok(jobs)))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.get_job(auth.user.id, job_id).await?;

    Ok(Json(ApiResponse::ok(job)))
}

pub async fn get_job_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let contract = app_state
        .contract_service
        .get_contract_for_job(auth.user.id, job_id)
        .await?;

    Ok(Json(ApiResponse::ok(ContractResponseDto::from_contract(
        &contract,
    ))))
}

pub async fn sign_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let contract = app_state
        .contract_service
        .sign_contract(auth.user.id, contract_id)
        .await?;

    Ok(Json(ApiResponse::ok(ContractResponseDto::from_contract(
        &contract,
    ))))
}

pub async fn mark_assessment_complete(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<MarkAssessmentCompleteDto>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .mark_assessment_complete(auth.user.id, job_id, body.start_date)
        .await?;

    Ok(Json(ApiResponse::ok(job)))
}

pub async fn set_start_date(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<SetStartDateDto>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .set_start_date(auth.user.id, job_id, body.start_date)
        .await?;

    Ok(Json(ApiResponse::ok(job)))
}

pub async fn confirm_care(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .confirm_care(auth.user.id, job_id)
        .await?;

    Ok(Json(ApiResponse::ok(job)))
}

pub async fn decline_care(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .decline_care(auth.user.id, job_id)
        .await?;

    Ok(Json(ApiResponse::ok(job)))
}

pub async fn cancel_pre_care(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .cancel_pre_care(auth.user.id, job_id)
        .await?;

    Ok(Json(ApiResponse::ok(job)))
}

pub async fn pause_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.pause_job(auth.user.id, job_id).await?;

    Ok(Json(ApiResponse::ok(job)))
}

pub async fn resume_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.resume_job(auth.user.id, job_id).await?;

    Ok(Json(ApiResponse::ok(job)))
}

pub async fn list_payments(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payments = app_state
        .job_service
        .list_payments(auth.user.id, job_id)
        .await?;

    Ok(Json(ApiResponse::ok(payments)))
}
