use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use num_traits::Zero;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::{
        caredb::CareExt,
        db::DBClient,
        settingsdb::{SettingsExt, BID_WINDOW_HOURS, DEFAULT_BID_WINDOW_HOURS},
        userdb::UserExt,
    },
    models::caremodel::{Bid, BidStatus, CareRequest, Job, NightType, RequestStatus},
    service::{
        agreement::{render_agreement_text, AgreementContext},
        error::ServiceError,
        notification_service::NotificationService,
    },
};

/// Bid ledger: open care requests, the bids placed against them, and the
/// acceptance step that converts a winning bid into a job plus its unsigned
/// rate agreement.
#[derive(Debug, Clone)]
pub struct BidService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
}

pub struct NewCareRequest {
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
}

fn validate_new_request(new_request: &NewCareRequest) -> Result<(), ServiceError> {
    if new_request.care_types.is_empty() {
        return Err(ServiceError::Validation(
            "At least one care type is required".to_string(),
        ));
    }
    if new_request.hours_per_week <= BigDecimal::zero() {
        return Err(ServiceError::InvalidHours(
            "Hours per week must be greater than zero".to_string(),
        ));
    }
    if let Some(nights) = new_request.nights_per_week {
        if nights < 0 || nights > 7 {
            return Err(ServiceError::Validation(
                "Nights per week must be between 0 and 7".to_string(),
            ));
        }
        if nights > 0 && new_request.night_type.is_none() {
            return Err(ServiceError::Validation(
                "Night type is required when overnight care is requested".to_string(),
            ));
        }
    }
    Ok(())
}

/// Rate validation happens before any write: an overnight request rejects
/// bids that omit the overnight rate.
fn validate_bid_rates(
    request: &CareRequest,
    hourly_rate: &BigDecimal,
    overnight_rate: Option<&BigDecimal>,
) -> Result<(), ServiceError> {
    if hourly_rate <= &BigDecimal::zero() {
        return Err(ServiceError::InvalidRate(
            "Hourly rate must be greater than zero".to_string(),
        ));
    }
    match overnight_rate {
        Some(rate) if rate <= &BigDecimal::zero() => {
            return Err(ServiceError::InvalidRate(
                "Overnight rate must be greater than zero".to_string(),
            ));
        }
        None if request.requires_overnight_rate() => {
            return Err(ServiceError::InvalidRate(
                "An overnight rate is required for this request".to_string(),
            ));
        }
        _ => {}
    }
    Ok(())
}

impl BidService {
    pub fn new(db_client: Arc<DBClient>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            db_client,
            notification_service,
        }
    }

    pub async fn create_care_request(
        &self,
        customer_id: Uuid,
        new_request: NewCareRequest,
    ) -> Result<CareRequest, ServiceError> {
        validate_new_request(&new_request)?;

        let bid_window_hours = self
            .db_client
            .get_i64_setting(BID_WINDOW_HOURS, DEFAULT_BID_WINDOW_HOURS)
            .await?;
        let bid_deadline = Utc::now() + Duration::hours(bid_window_hours);

        let request = self
            .db_client
            .create_care_request(
                customer_id,
                new_request.postcode,
                new_request.latitude,
                new_request.longitude,
                new_request.care_types,
                new_request.hours_per_week,
                new_request.frequency,
                new_request.nights_per_week,
                new_request.night_type,
                new_request.recipient_name,
                new_request.recipient_dob,
                new_request.recipient_address,
                new_request.recipient_relationship,
                bid_deadline,
            )
            .await?;

        tracing::info!(
            "Care request {} created by customer {}",
            request.id,
            customer_id
        );

        Ok(request)
    }

    pub async fn close_care_request(
        &self,
        customer_id: Uuid,
        request_id: Uuid,
    ) -> Result<CareRequest, ServiceError> {
        let request = self
            .db_client
            .get_care_request_by_id(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound(request_id))?;

        if request.customer_id != customer_id {
            return Err(ServiceError::NotRequestOwner(customer_id, request_id));
        }
        if request.status != Some(RequestStatus::Open) {
            return Err(ServiceError::RequestNotOpen(request_id));
        }

        let request = self
            .db_client
            .update_request_status(request_id, RequestStatus::Closed)
            .await?;

        Ok(request)
    }

    pub async fn place_bid(
        &self,
        agency_user_id: Uuid,
        request_id: Uuid,
        hourly_rate: BigDecimal,
        overnight_rate: Option<BigDecimal>,
        notes: Option<String>,
    ) -> Result<Bid, ServiceError> {
        let request = self
            .db_client
            .get_care_request_by_id(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound(request_id))?;

        if request.status != Some(RequestStatus::Open) {
            return Err(ServiceError::RequestNotOpen(request_id));
        }
        if let Some(deadline) = request.bid_deadline {
            if Utc::now() > deadline {
                return Err(ServiceError::RequestNotOpen(request_id));
            }
        }

        validate_bid_rates(&request, &hourly_rate, overnight_rate.as_ref())?;

        let profile = self
            .db_client
            .get_agency_profile_by_user(agency_user_id)
            .await?
            .ok_or(ServiceError::AgencyProfileNotFound(agency_user_id))?;

        // The insert and the ledger counters commit together.
        let mut tx = self.db_client.pool.begin().await?;
        let bid = self
            .db_client
            .insert_bid(
                &mut tx,
                request_id,
                agency_user_id,
                profile.id,
                hourly_rate.clone(),
                overnight_rate,
                notes,
            )
            .await?;
        self.db_client
            .bump_request_bid_stats(&mut tx, request_id, &hourly_rate)
            .await?;
        tx.commit().await?;

        self.notification_service
            .notify_new_bid(request.customer_id, request_id, &hourly_rate)
            .await;

        Ok(bid)
    }

    pub async fn list_bids(
        &self,
        caller_id: Uuid,
        request_id: Uuid,
    ) -> Result<Vec<Bid>, ServiceError> {
        let request = self
            .db_client
            .get_care_request_by_id(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound(request_id))?;

        if request.customer_id != caller_id {
            return Err(ServiceError::NotRequestOwner(caller_id, request_id));
        }

        Ok(self.db_client.get_bids_for_request(request_id).await?)
    }

    pub async fn withdraw_bid(
        &self,
        agency_user_id: Uuid,
        bid_id: Uuid,
    ) -> Result<Bid, ServiceError> {
        match self.db_client.withdraw_bid(bid_id, agency_user_id).await? {
            Some(bid) => Ok(bid),
            None => {
                // Distinguish a missing bid from one no longer active.
                let bid = self
                    .db_client
                    .get_bid_by_id(bid_id)
                    .await?
                    .ok_or(ServiceError::BidNotFound(bid_id))?;
                if bid.agency_user_id != agency_user_id {
                    return Err(ServiceError::NotAuthorized(agency_user_id, bid_id));
                }
                Err(ServiceError::Validation(
                    "Only an active bid can be withdrawn".to_string(),
                ))
            }
        }
    }

    /// Accepts a bid: one transaction flips the request, settles sibling
    /// bids, opens the job and captures the unsigned rate agreement. A
    /// concurrent acceptance loses on the request status guard and rolls
    /// back untouched.
    pub async fn accept_bid(
        &self,
        customer_id: Uuid,
        request_id: Uuid,
        bid_id: Uuid,
    ) -> Result<Job, ServiceError> {
        let request = self
            .db_client
            .get_care_request_by_id(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound(request_id))?;

        if request.customer_id != customer_id {
            return Err(ServiceError::NotRequestOwner(customer_id, request_id));
        }

        let bid = self
            .db_client
            .get_bid_by_id(bid_id)
            .await?
            .ok_or(ServiceError::BidNotFound(bid_id))?;

        if bid.care_request_id != request_id {
            return Err(ServiceError::Validation(
                "Bid does not belong to this care request".to_string(),
            ));
        }
        if bid.status != Some(BidStatus::Active) {
            return Err(ServiceError::Validation(
                "Only an active bid can be accepted".to_string(),
            ));
        }

        let customer = self
            .db_client
            .get_user(Some(customer_id), None)
            .await?
            .ok_or(ServiceError::Validation(
                "Customer account no longer exists".to_string(),
            ))?;
        let profile = self
            .db_client
            .get_agency_profile_by_id(bid.agency_profile_id)
            .await?
            .ok_or(ServiceError::AgencyProfileNotFound(bid.agency_user_id))?;

        let mut tx = self.db_client.pool.begin().await?;

        let accepted = self
            .db_client
            .mark_request_accepted(&mut tx, request_id, bid_id)
            .await?;
        if accepted.is_none() {
            tx.rollback().await?;
            return Err(ServiceError::RequestNotOpen(request_id));
        }

        self.db_client
            .set_bid_status(&mut tx, bid_id, BidStatus::Accepted)
            .await?;
        self.db_client
            .reject_sibling_bids(&mut tx, request_id, bid_id)
            .await?;

        let job = self
            .db_client
            .insert_job(
                &mut tx,
                request_id,
                bid_id,
                customer_id,
                bid.agency_user_id,
                bid.agency_profile_id,
                bid.hourly_rate.clone(),
                request.hours_per_week.clone(),
            )
            .await?;

        let agreement_text = render_agreement_text(&AgreementContext {
            account_holder_name: customer.name,
            account_holder_address: customer.address.unwrap_or_default(),
            recipient_name: request.recipient_name.clone(),
            recipient_dob: request.recipient_dob,
            recipient_address: request.recipient_address.clone(),
            recipient_relationship: request.recipient_relationship.clone(),
            agency_name: profile.agency_name,
            cqc_provider_id: profile.cqc_provider_id,
            hourly_rate: bid.hourly_rate,
            overnight_rate: bid.overnight_rate,
            nights_per_week: request.nights_per_week,
            night_type: request.night_type,
            hours_per_week: request.hours_per_week,
            frequency: request.frequency,
            start_date: job.start_date,
            care_types: request.care_types,
        });
        self.db_client
            .insert_contract(&mut tx, job.id, customer_id, bid.agency_user_id, agreement_text)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Bid {} accepted on request {}; job {} opened",
            bid_id,
            request_id,
            job.id
        );

        self.notification_service.notify_bid_accepted(&job).await;

        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn open_request(care_types: Vec<&str>, nights: Option<i32>) -> CareRequest {
        CareRequest {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            postcode: "LS1 4AP".to_string(),
            latitude: None,
            longitude: None,
            care_types: care_types.into_iter().map(String::from).collect(),
            hours_per_week: BigDecimal::from(14),
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

    #[test]
    fn rejects_non_positive_hourly_rate() {
        let request = open_request(vec!["Personal Care"], None);
        let zero = BigDecimal::zero();
        assert!(matches!(
            validate_bid_rates(&request, &zero, None),
            Err(ServiceError::InvalidRate(_))
        ));
    }

    #[test]
    fn overnight_request_requires_overnight_rate() {
        let request = open_request(vec!["Overnight Care"], Some(3));
        let rate = BigDecimal::from_str("21.50").unwrap();
        assert!(matches!(
            validate_bid_rates(&request, &rate, None),
            Err(ServiceError::InvalidRate(_))
        ));

        let overnight = BigDecimal::from(95);
        assert!(validate_bid_rates(&request, &rate, Some(&overnight)).is_ok());
    }

    #[test]
    fn day_request_accepts_bid_without_overnight_rate() {
        let request = open_request(vec!["Personal Care"], None);
        let rate = BigDecimal::from_str("19.00").unwrap();
        assert!(validate_bid_rates(&request, &rate, None).is_ok());
    }

    #[test]
    fn new_request_validation() {
        let valid = NewCareRequest {
            postcode: "LS1 4AP".to_string(),
            latitude: None,
            longitude: None,
            care_types: vec!["Personal Care".to_string()],
            hours_per_week: BigDecimal::from(10),
            frequency: "weekly".to_string(),
            nights_per_week: None,
            night_type: None,
            recipient_name: "Edith Crane".to_string(),
            recipient_dob: NaiveDate::from_ymd_opt(1941, 3, 2).unwrap(),
            recipient_address: "4 Larch Way".to_string(),
            recipient_relationship: "Mother".to_string(),
        };
        assert!(validate_new_request(&valid).is_ok());

        let mut no_types = NewCareRequest {
            care_types: vec![],
            ..valid
        };
        assert!(matches!(
            validate_new_request(&no_types),
            Err(ServiceError::Validation(_))
        ));

        no_types.care_types = vec!["Overnight Care".to_string()];
        no_types.nights_per_week = Some(3);
        assert!(matches!(
            validate_new_request(&no_types),
            Err(ServiceError::Validation(_))
        ));

        no_types.night_type = Some(NightType::Waking);
        assert!(validate_new_request(&no_types).is_ok());

        no_types.hours_per_week = BigDecimal::zero();
        assert!(matches!(
            validate_new_request(&no_types),
            Err(ServiceError::InvalidHours(_))
        ));
    }
}
