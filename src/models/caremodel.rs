use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

pub const OVERNIGHT_CARE_TYPE: &str = "Overnight Care";

/// A third query on the same timesheet always escalates instead of querying.
pub const MAX_QUERIES_PER_TIMESHEET: i32 = 2;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    AcceptingBids,
    Accepted,
    Closed,
    Cancelled,
}

impl RequestStatus {
    pub fn to_str(&self) -> &str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::AcceptingBids => "accepting_bids",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Closed => "closed",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "bid_status", rename_all = "snake_case")]
pub enum BidStatus {
    Active,
    Accepted,
    Rejected,
    Withdrawn,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    AssessmentPending,
    AssessmentComplete,
    Active,
    Paused,
    Completed,
    Disputed,
    CancelledPreCare,
}

impl JobStatus {
    pub fn to_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::AssessmentPending => "assessment_pending",
            JobStatus::AssessmentComplete => "assessment_complete",
            JobStatus::Active => "active",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Disputed => "disputed",
            JobStatus::CancelledPreCare => "cancelled_pre_care",
        }
    }

    /// Pre-care cancellation is only reachable before care has been confirmed.
    pub fn can_cancel_pre_care(&self) -> bool {
        matches!(self, JobStatus::AssessmentPending | JobStatus::AssessmentComplete)
    }

    /// The agency may edit the start date once assessment is done, including
    /// after care has begun.
    pub fn allows_start_date_edit(&self) -> bool {
        matches!(self, JobStatus::AssessmentComplete | JobStatus::Active)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "timesheet_status", rename_all = "snake_case")]
pub enum TimesheetStatus {
    Submitted,
    Approved,
    Queried,
    Resubmitted,
    Escalated,
}

impl TimesheetStatus {
    pub fn to_str(&self) -> &str {
        match self {
            TimesheetStatus::Submitted => "submitted",
            TimesheetStatus::Approved => "approved",
            TimesheetStatus::Queried => "queried",
            TimesheetStatus::Resubmitted => "resubmitted",
            TimesheetStatus::Escalated => "escalated",
        }
    }

    pub fn can_approve(&self) -> bool {
        matches!(
            self,
            TimesheetStatus::Submitted | TimesheetStatus::Queried | TimesheetStatus::Resubmitted
        )
    }

    pub fn can_query(&self) -> bool {
        matches!(self, TimesheetStatus::Submitted | TimesheetStatus::Resubmitted)
    }

    pub fn can_respond(&self) -> bool {
        matches!(self, TimesheetStatus::Queried)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "night_type", rename_all = "snake_case")]
pub enum NightType {
    Sleeping,
    Waking,
}

impl NightType {
    pub fn to_str(&self) -> &str {
        match self {
            NightType::Sleeping => "sleeping",
            NightType::Waking => "waking",
        }
    }
}

/// Signing progress derived from the two agreement timestamps. Never stored.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SigningState {
    Unsigned,
    CustomerSigned,
    AgencySigned,
    FullySigned,
}

/// Result of attempting another query on a timesheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryOutcome {
    Query,
    Escalate,
}

/// The cap is on the count *after* this call: the third query escalates.
pub fn query_outcome(current_query_count: i32) -> QueryOutcome {
    if current_query_count + 1 > MAX_QUERIES_PER_TIMESHEET {
        QueryOutcome::Escalate
    } else {
        QueryOutcome::Query
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct AgencyProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agency_name: String,
    pub cqc_provider_id: Option<String>,
    pub cqc_location_id: Option<String>,
    pub postcode: String,
    pub service_radius_miles: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CareRequest {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub postcode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub care_types: Vec<String>,
    pub hours_per_week: BigDecimal,
    pub frequency: String,
    pub nights_per_week: Option<i32>,
    pub night_type: Option<NightType>,
    pub recipient_name: String,
    pub recipient_dob: NaiveDate,
    pub recipient_address: String,
    pub recipient_relationship: String,
    pub bid_deadline: Option<DateTime<Utc>>,
    pub status: Option<RequestStatus>,         // Database has DEFAULT 'open'
    pub bids_count: Option<i32>,               // Database has DEFAULT 0
    pub lowest_bid_rate: Option<BigDecimal>,
    pub winning_bid_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CareRequest {
    /// Overnight requests must carry an overnight rate on every bid.
    pub fn requires_overnight_rate(&self) -> bool {
        self.care_types.iter().any(|t| t == OVERNIGHT_CARE_TYPE)
            && self.nights_per_week.map_or(false, |n| n > 0)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Bid {
    pub id: Uuid,
    pub care_request_id: Uuid,
    pub agency_user_id: Uuid,
    pub agency_profile_id: Uuid,
    pub hourly_rate: BigDecimal,
    pub overnight_rate: Option<BigDecimal>,
    pub notes: Option<String>,
    pub status: Option<BidStatus>,             // Database has DEFAULT 'active'
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Job {
    pub id: Uuid,
    pub care_request_id: Uuid,
    pub winning_bid_id: Uuid,
    pub customer_id: Uuid,
    pub agency_id: Uuid,
    pub agency_profile_id: Uuid,
    pub locked_hourly_rate: BigDecimal,
    pub agreed_hours_per_week: BigDecimal,
    pub start_date: Option<NaiveDate>,         // NULL = start date to be confirmed
    pub status: Option<JobStatus>,             // Database has DEFAULT 'pending'
    pub total_paid_to_date: Option<BigDecimal>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.customer_id == user_id || self.agency_id == user_id
    }

    pub fn other_party(&self, user_id: Uuid) -> Uuid {
        if self.customer_id == user_id {
            self.agency_id
        } else {
            self.customer_id
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Contract {
    pub id: Uuid,
    pub job_id: Uuid,
    pub customer_id: Uuid,
    pub agency_id: Uuid,
    pub agreement_text: String,
    pub customer_agreed_at: Option<DateTime<Utc>>,
    pub agency_agreed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Contract {
    pub fn signing_state(&self) -> SigningState {
        match (self.customer_agreed_at, self.agency_agreed_at) {
            (None, None) => SigningState::Unsigned,
            (Some(_), None) => SigningState::CustomerSigned,
            (None, Some(_)) => SigningState::AgencySigned,
            (Some(_), Some(_)) => SigningState::FullySigned,
        }
    }

    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.customer_id == user_id || self.agency_id == user_id
    }

    pub fn has_signed(&self, user_id: Uuid) -> bool {
        (user_id == self.customer_id && self.customer_agreed_at.is_some())
            || (user_id == self.agency_id && self.agency_agreed_at.is_some())
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Timesheet {
    pub id: Uuid,
    pub job_id: Uuid,
    pub submitted_by: Uuid,
    pub week_starting: NaiveDate,
    pub hours_worked: BigDecimal,
    pub notes: Option<String>,
    pub status: Option<TimesheetStatus>,       // Database has DEFAULT 'submitted'
    pub adjusted_hours: Option<BigDecimal>,
    pub suggested_hours: Option<BigDecimal>,
    pub query_note: Option<String>,
    pub query_response: Option<String>,
    pub queried_at: Option<DateTime<Utc>>,
    pub response_deadline: Option<DateTime<Utc>>,
    pub query_count: Option<i32>,              // Database has DEFAULT 0
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Timesheet {
    /// The quantity actually billed: agency-adjusted hours win over the
    /// original submission.
    pub fn effective_hours(&self) -> BigDecimal {
        self.adjusted_hours
            .clone()
            .unwrap_or_else(|| self.hours_worked.clone())
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub job_id: Uuid,
    pub timesheet_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub status: Option<PaymentStatus>,         // Database has DEFAULT 'pending'
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Money is stored at full precision and rounded to 2 dp only for display.
pub fn display_money(amount: &BigDecimal) -> String {
    format!("\u{a3}{}", amount.round(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request_with(care_types: Vec<&str>, nights: Option<i32>) -> CareRequest {
        CareRequest {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            postcode: "SW1A 1AA".to_string(),
            latitude: None,
            longitude: None,
            care_types: care_types.into_iter().map(String::from).collect(),
            hours_per_week: BigDecimal::from(10),
            frequency: "weekly".to_string(),
            nights_per_week: nights,
            night_type: nights.map(|_| NightType::Sleeping),
            recipient_name: "Edith Crane".to_string(),
            recipient_dob: NaiveDate::from_ymd_opt(1941, 3, 2).unwrap(),
            recipient_address: "4 Larch Way".to_string(),
            recipient_relationship: "Mother".to_string(),
            bid_deadline: None,
            status: Some(RequestStatus::Open),
            bids_count: Some(0),
            lowest_bid_rate: None,
            winning_bid_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn timesheet_with(hours: &str, adjusted: Option<&str>) -> Timesheet {
        Timesheet {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            submitted_by: Uuid::new_v4(),
            week_starting: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            hours_worked: BigDecimal::from_str(hours).unwrap(),
            notes: None,
            status: Some(TimesheetStatus::Submitted),
            adjusted_hours: adjusted.map(|h| BigDecimal::from_str(h).unwrap()),
            suggested_hours: None,
            query_note: None,
            query_response: None,
            queried_at: None,
            response_deadline: None,
            query_count: Some(0),
            approved_at: None,
            created_at: None,
        }
    }

    #[test]
    fn overnight_rate_required_only_with_nights() {
        assert!(request_with(vec!["Overnight Care"], Some(3)).requires_overnight_rate());
        assert!(!request_with(vec!["Overnight Care"], Some(0)).requires_overnight_rate());
        assert!(!request_with(vec!["Overnight Care"], None).requires_overnight_rate());
        assert!(!request_with(vec!["Personal Care"], Some(3)).requires_overnight_rate());
    }

    #[test]
    fn signing_state_derivation() {
        let mut contract = Contract {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            agency_id: Uuid::new_v4(),
            agreement_text: String::new(),
            customer_agreed_at: None,
            agency_agreed_at: None,
            created_at: None,
        };
        assert_eq!(contract.signing_state(), SigningState::Unsigned);

        contract.customer_agreed_at = Some(Utc::now());
        assert_eq!(contract.signing_state(), SigningState::CustomerSigned);

        contract.agency_agreed_at = Some(Utc::now());
        assert_eq!(contract.signing_state(), SigningState::FullySigned);

        contract.customer_agreed_at = None;
        assert_eq!(contract.signing_state(), SigningState::AgencySigned);
    }

    #[test]
    fn effective_hours_prefers_adjustment() {
        assert_eq!(
            timesheet_with("20", None).effective_hours(),
            BigDecimal::from(20)
        );
        assert_eq!(
            timesheet_with("20", Some("18")).effective_hours(),
            BigDecimal::from(18)
        );
    }

    #[test]
    fn third_query_always_escalates() {
        assert_eq!(query_outcome(0), QueryOutcome::Query);
        assert_eq!(query_outcome(1), QueryOutcome::Query);
        assert_eq!(query_outcome(2), QueryOutcome::Escalate);
        assert_eq!(query_outcome(5), QueryOutcome::Escalate);
    }

    #[test]
    fn timesheet_status_guards() {
        assert!(TimesheetStatus::Submitted.can_approve());
        assert!(TimesheetStatus::Queried.can_approve());
        assert!(TimesheetStatus::Resubmitted.can_approve());
        assert!(!TimesheetStatus::Approved.can_approve());
        assert!(!TimesheetStatus::Escalated.can_approve());

        assert!(TimesheetStatus::Submitted.can_query());
        assert!(TimesheetStatus::Resubmitted.can_query());
        assert!(!TimesheetStatus::Queried.can_query());

        assert!(TimesheetStatus::Queried.can_respond());
        assert!(!TimesheetStatus::Resubmitted.can_respond());
    }

    #[test]
    fn pre_care_cancellation_window() {
        assert!(JobStatus::AssessmentPending.can_cancel_pre_care());
        assert!(JobStatus::AssessmentComplete.can_cancel_pre_care());
        assert!(!JobStatus::Pending.can_cancel_pre_care());
        assert!(!JobStatus::Active.can_cancel_pre_care());
        assert!(!JobStatus::Completed.can_cancel_pre_care());
    }

    #[test]
    fn money_rounds_for_display_only() {
        let amount = BigDecimal::from_str("359.999").unwrap();
        assert_eq!(display_money(&amount), "\u{a3}360.00");
        let exact = BigDecimal::from_str("360").unwrap();
        assert_eq!(display_money(&exact), "\u{a3}360.00");
    }
}
