use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::Validate;

use crate::{models::caremodel::*, service::rating_registry::CqcRating};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            status: "success".to_string(),
            data,
        }
    }
}

// Care request DTOs

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateCareRequestDto {
    #[validate(length(min = 1, message = "Postcode is required"))]
    pub postcode: String,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    #[validate(length(min = 1, message = "At least one care type is required"))]
    pub care_types: Vec<String>,

    pub hours_per_week: BigDecimal,

    #[validate(length(min = 1, message = "Frequency is required"))]
    pub frequency: String,

    #[validate(range(min = 0, max = 7, message = "Nights per week must be between 0 and 7"))]
    pub nights_per_week: Option<i32>,

    pub night_type: Option<NightType>,

    #[validate(length(min = 1, message = "Recipient name is required"))]
    pub recipient_name: String,

    pub recipient_dob: NaiveDate,

    #[validate(length(min = 1, message = "Recipient address is required"))]
    pub recipient_address: String,

    #[validate(length(min = 1, message = "Relationship to the recipient is required"))]
    pub recipient_relationship: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CareRequestResponseDto {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub postcode: String,
    pub care_types: Vec<String>,
    pub hours_per_week: BigDecimal,
    pub frequency: String,
    pub nights_per_week: Option<i32>,
    pub night_type: Option<NightType>,
    pub status: Option<RequestStatus>,
    pub bids_count: i32,
    pub lowest_bid_rate: Option<BigDecimal>,
    pub bid_deadline: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl CareRequestResponseDto {
    /// Public view of a request: recipient details stay private to the
    /// customer until a bid is accepted.
    pub fn from_request(request: &CareRequest) -> Self {
        CareRequestResponseDto {
            id: request.id,
            customer_id: request.customer_id,
            postcode: request.postcode.clone(),
            care_types: request.care_types.clone(),
            hours_per_week: request.hours_per_week.clone(),
            frequency: request.frequency.clone(),
            nights_per_week: request.nights_per_week,
            night_type: request.night_type,
            status: request.status,
            bids_count: request.bids_count.unwrap_or(0),
            lowest_bid_rate: request.lowest_bid_rate.clone(),
            bid_deadline: request.bid_deadline,
            created_at: request.created_at,
        }
    }
}

// Bid DTOs

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PlaceBidDto {
    pub hourly_rate: BigDecimal,

    pub overnight_rate: Option<BigDecimal>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptBidDto {
    pub bid_id: Uuid,
}

// Job DTOs

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAssessmentCompleteDto {
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetStartDateDto {
    pub start_date: Option<NaiveDate>,
}

// Timesheet DTOs

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SubmitTimesheetDto {
    pub job_id: Uuid,

    pub week_starting: NaiveDate,

    pub hours_worked: BigDecimal,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct QueryTimesheetDto {
    #[validate(length(min = 1, max = 1000, message = "A query note is required"))]
    pub query_note: String,

    pub suggested_hours: Option<BigDecimal>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RespondTimesheetDto {
    #[validate(length(min = 1, max = 1000, message = "A response note is required"))]
    pub response_note: String,

    /// "adjust" or "respond".
    #[validate(length(min = 1, message = "Response mode is required"))]
    pub mode: String,

    pub adjusted_hours: Option<BigDecimal>,
}

// Agency profile DTOs

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateAgencyProfileDto {
    #[validate(length(min = 1, max = 200, message = "Agency name is required"))]
    pub agency_name: String,

    pub cqc_provider_id: Option<String>,
    pub cqc_location_id: Option<String>,

    #[validate(length(min = 1, message = "Postcode is required"))]
    pub postcode: String,

    #[validate(range(min = 1, message = "Service radius must be at least 1 mile"))]
    pub service_radius_miles: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgencyProfileResponseDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agency_name: String,
    pub cqc_provider_id: Option<String>,
    pub cqc_location_id: Option<String>,
    pub postcode: String,
    pub service_radius_miles: i32,
    /// Live CQC rating, absent when the registry is unreachable or the
    /// agency is not registered.
    pub cqc_rating: Option<CqcRating>,
    pub created_at: Option<DateTime<Utc>>,
}

impl AgencyProfileResponseDto {
    pub fn from_profile(profile: &AgencyProfile, cqc_rating: Option<CqcRating>) -> Self {
        AgencyProfileResponseDto {
            id: profile.id,
            user_id: profile.user_id,
            agency_name: profile.agency_name.clone(),
            cqc_provider_id: profile.cqc_provider_id.clone(),
            cqc_location_id: profile.cqc_location_id.clone(),
            postcode: profile.postcode.clone(),
            service_radius_miles: profile.service_radius_miles,
            cqc_rating,
            created_at: profile.created_at,
        }
    }
}

// Contract DTOs

#[derive(Debug, Serialize, Deserialize)]
pub struct ContractResponseDto {
    pub id: Uuid,
    pub job_id: Uuid,
    pub agreement_text: String,
    pub signing_state: SigningState,
    pub customer_agreed_at: Option<DateTime<Utc>>,
    pub agency_agreed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ContractResponseDto {
    pub fn from_contract(contract: &Contract) -> Self {
        ContractResponseDto {
            id: contract.id,
            job_id: contract.job_id,
            agreement_text: contract.agreement_text.clone(),
            signing_state: contract.signing_state(),
            customer_agreed_at: contract.customer_agreed_at,
            agency_agreed_at: contract.agency_agreed_at,
            created_at: contract.created_at,
        }
    }
}

// Admin settings DTOs

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateSettingDto {
    #[validate(length(min = 1, max = 200, message = "A value is required"))]
    pub value: String,
}
