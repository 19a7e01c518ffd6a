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
    db::caredb::CareExt,
    dtos::caredtos::*,
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    service::bid_service::NewCareRequest,
    AppState,
};

pub fn requests_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_care_request).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Customer, UserRole::Admin])
            })),
        )
        .route("/", get(list_care_requests))
        .route("/:request_id", get(get_care_request))
        .route("/:request_id/close", put(close_care_request))
        .route(
            "/:request_id/bids",
            post(place_bid).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Agency])
            })),
        )
        .route("/:request_id/bids", get(list_bids))
        .route("/:request_id/accept", post(accept_bid))
        .route("/:request_id/lowest-active-rate", get(get_lowest_active_rate))
        .route("/bids/:bid_id/withdraw", put(withdraw_bid))
}

pub async fn create_care_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateCareRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let request = app_state
        .bid_service
        .create_care_request(
            auth.user.id,
            NewCareRequest {
                postcode: body.postcode,
                latitude: body.latitude,
                longitude: body.longitude,
                care_types: body.care_types,
                hours_per_week: body.hours_per_week,
                frequency: body.frequency,
                nights_per_week: body.nights_per_week,
                night_type: body.night_type,
                recipient_name: body.recipient_name,
                recipient_dob: body.recipient_dob,
                recipient_address: body.recipient_address,
                recipient_relationship: body.recipient_relationship,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(request))))
}

/// Customers see their own requests; agencies browse the open book.
pub async fn list_care_requests(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    match auth.user.role {
        UserRole::Agency => {
            let requests = app_state
                .db_client
                .get_open_requests()
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;
            let view: Vec<CareRequestResponseDto> = requests
                .iter()
                .map(CareRequestResponseDto::from_request)
                .collect();
            Ok(Json(ApiResponse::ok(view)).into_response())
        }
        _ => {
            let requests = app_state
                .db_client
                .get_customer_requests(auth.user.id)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;
            Ok(Json(ApiResponse::ok(requests)).into_response())
        }
    }
}

pub async fn get_care_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .db_client
        .get_care_request_by_id(request_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Care request not found".to_string()))?;

    if request.customer_id == auth.user.id || auth.user.role == UserRole::Admin {
        Ok(Json(ApiResponse::ok(request)).into_response())
    } else {
        // Recipient details stay private until a bid is accepted.
        Ok(Json(ApiResponse::ok(CareRequestResponseDto::from_request(&request))).into_response())
    }
}

pub async fn close_care_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .bid_service
        .close_care_request(auth.user.id, request_id)
        .await?;

    Ok(Json(ApiResponse::ok(request)))
}

pub async fn place_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<PlaceBidDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let bid = app_state
        .bid_service
        .place_bid(
            auth.user.id,
            request_id,
            body.hourly_rate,
            body.overnight_rate,
            body.notes,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(bid))))
}

pub async fn list_bids(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let bids = app_state
        .bid_service
        .list_bids(auth.user.id, request_id)
        .await?;

    Ok(Json(ApiResponse::ok(bids)))
}

pub async fn accept_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<AcceptBidDto>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .bid_service
        .accept_bid(auth.user.id, request_id, body.bid_id)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(job))))
}

/// On-demand reconciliation view of the displayed lowest rate. The stored
/// ratchet is never rewritten from here.
pub async fn get_lowest_active_rate(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .db_client
        .get_care_request_by_id(request_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Care request not found".to_string()))?;

    if request.customer_id != auth.user.id && auth.user.role != UserRole::Admin {
        return Err(HttpError::forbidden(
            "Only the request owner can view this".to_string(),
        ));
    }

    let lowest_active = app_state
        .db_client
        .recompute_lowest_active_rate(request_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "stored_lowest_bid_rate": request.lowest_bid_rate,
        "lowest_active_rate": lowest_active,
    }))))
}

pub async fn withdraw_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(bid_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let bid = app_state.bid_service.withdraw_bid(auth.user.id, bid_id).await?;

    Ok(Json(ApiResponse::ok(bid)))
}
