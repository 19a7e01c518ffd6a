use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use num_traits::Zero;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::{
        caredb::CareExt,
        db::DBClient,
        settingsdb::{SettingsExt, DEFAULT_QUERY_EXPIRY_ACTION, QUERY_EXPIRY_ACTION},
    },
    models::caremodel::{
        query_outcome, Job, JobStatus, QueryOutcome, Timesheet, TimesheetStatus,
    },
    service::{error::ServiceError, notification_service::NotificationService},
};

/// Response window given to the other side after a query or resubmission.
/// The deadline is advisory unless the auto-settle sweep is switched on.
pub const QUERY_RESPONSE_WINDOW_HOURS: i64 = 24;

const MAX_WEEKLY_HOURS: i64 = 168;

/// How the agency answers a query: adjust the hours, or stand by them with
/// an explanation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RespondMode {
    Adjust,
    Respond,
}

impl RespondMode {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        match value {
            "adjust" => Ok(RespondMode::Adjust),
            "respond" => Ok(RespondMode::Respond),
            other => Err(ServiceError::Validation(format!(
                "Unknown response mode '{}': expected 'adjust' or 'respond'",
                other
            ))),
        }
    }
}

/// Payment for an approved timesheet: billed hours times the rate locked at
/// bid acceptance. Full precision, no rounding.
fn payment_amount(effective_hours: &BigDecimal, locked_hourly_rate: &BigDecimal) -> BigDecimal {
    effective_hours * locked_hourly_rate
}

/// One timesheet per job per week: the table's uniqueness constraint backs
/// this, and the violation comes back as a validation failure rather than a
/// bare database error.
fn map_submit_error(week_starting: NaiveDate, e: sqlx::Error) -> ServiceError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            ServiceError::Validation(format!(
                "A timesheet for the week starting {} has already been submitted for this job",
                week_starting.format("%d %B %Y")
            ))
        }
        other => ServiceError::Database(other),
    }
}

fn validate_submitted_hours(hours: &BigDecimal) -> Result<(), ServiceError> {
    if hours <= &BigDecimal::zero() {
        return Err(ServiceError::InvalidHours(
            "Hours worked must be greater than zero".to_string(),
        ));
    }
    if hours > &BigDecimal::from(MAX_WEEKLY_HOURS) {
        return Err(ServiceError::InvalidHours(format!(
            "Hours worked cannot exceed {} in one week",
            MAX_WEEKLY_HOURS
        )));
    }
    Ok(())
}

/// Timesheet settlement: weekly submission, customer approval or query, the
/// agency's response, the two-query escalation cap and payment recording.
#[derive(Debug, Clone)]
pub struct TimesheetService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
}

impl TimesheetService {
    pub fn new(db_client: Arc<DBClient>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            db_client,
            notification_service,
        }
    }

    async fn load_timesheet_and_job(
        &self,
        timesheet_id: Uuid,
    ) -> Result<(Timesheet, Job), ServiceError> {
        let timesheet = self
            .db_client
            .get_timesheet_by_id(timesheet_id)
            .await?
            .ok_or(ServiceError::TimesheetNotFound(timesheet_id))?;
        let job = self
            .db_client
            .get_job_by_id(timesheet.job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(timesheet.job_id))?;

        Ok((timesheet, job))
    }

    pub async fn submit_timesheet(
        &self,
        agency_user_id: Uuid,
        job_id: Uuid,
        week_starting: NaiveDate,
        hours_worked: BigDecimal,
        notes: Option<String>,
    ) -> Result<Timesheet, ServiceError> {
        validate_submitted_hours(&hours_worked)?;

        let job = self
            .db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if job.agency_id != agency_user_id {
            return Err(ServiceError::NotAuthorized(agency_user_id, job_id));
        }
        let status = job.status.unwrap_or(JobStatus::Pending);
        if status != JobStatus::Active {
            return Err(ServiceError::WrongJobStatus(job_id, status));
        }

        let timesheet = self
            .db_client
            .insert_timesheet(job_id, agency_user_id, week_starting, hours_worked, notes)
            .await
            .map_err(|e| map_submit_error(week_starting, e))?;

        self.notification_service
            .notify_timesheet_submitted(&job, &timesheet)
            .await;

        Ok(timesheet)
    }

    pub async fn list_timesheets(
        &self,
        caller_id: Uuid,
        job_id: Uuid,
    ) -> Result<Vec<Timesheet>, ServiceError> {
        let job = self
            .db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if !job.is_party(caller_id) {
            return Err(ServiceError::NotAuthorized(caller_id, job_id));
        }

        Ok(self.db_client.get_timesheets_for_job(job_id).await?)
    }

    /// Approves the timesheet and records its payment in one transaction:
    /// the status flip, the payment row and the job's recomputed running
    /// total commit together or not at all.
    pub async fn approve_timesheet(
        &self,
        customer_id: Uuid,
        timesheet_id: Uuid,
    ) -> Result<Timesheet, ServiceError> {
        let (timesheet, job) = self.load_timesheet_and_job(timesheet_id).await?;

        if job.customer_id != customer_id {
            return Err(ServiceError::NotAuthorized(customer_id, job.id));
        }
        let status = timesheet.status.unwrap_or(TimesheetStatus::Submitted);
        if !status.can_approve() {
            return Err(ServiceError::WrongTimesheetStatus(timesheet_id, status));
        }

        let (approved, amount) = self.settle(&job, timesheet_id, None).await?;

        self.notification_service
            .notify_timesheet_approved(&job, &amount)
            .await;

        Ok(approved)
    }

    /// Customer disputes the submitted hours. The first two queries open a
    /// 24-hour response window for the agency; a third query escalates to
    /// platform support instead and the timesheet leaves the normal flow.
    pub async fn query_timesheet(
        &self,
        customer_id: Uuid,
        timesheet_id: Uuid,
        query_note: String,
        suggested_hours: Option<BigDecimal>,
    ) -> Result<Timesheet, ServiceError> {
        if query_note.trim().is_empty() {
            return Err(ServiceError::Validation(
                "A query must carry a note explaining the dispute".to_string(),
            ));
        }
        if let Some(hours) = &suggested_hours {
            validate_submitted_hours(hours)?;
        }

        let (timesheet, job) = self.load_timesheet_and_job(timesheet_id).await?;

        if job.customer_id != customer_id {
            return Err(ServiceError::NotAuthorized(customer_id, job.id));
        }
        let status = timesheet.status.unwrap_or(TimesheetStatus::Submitted);
        if !status.can_query() {
            return Err(ServiceError::WrongTimesheetStatus(timesheet_id, status));
        }

        match query_outcome(timesheet.query_count.unwrap_or(0)) {
            QueryOutcome::Escalate => {
                let escalated = self
                    .db_client
                    .escalate_timesheet(timesheet_id)
                    .await?
                    .ok_or(ServiceError::WrongTimesheetStatus(timesheet_id, status))?;

                tracing::info!("Timesheet {} escalated after repeated queries", timesheet_id);

                self.notification_service
                    .notify_timesheet_escalated(&job, &escalated)
                    .await;

                Ok(escalated)
            }
            QueryOutcome::Query => {
                let deadline = Utc::now() + Duration::hours(QUERY_RESPONSE_WINDOW_HOURS);
                let queried = self
                    .db_client
                    .mark_timesheet_queried(timesheet_id, query_note, suggested_hours, deadline)
                    .await?
                    .ok_or(ServiceError::WrongTimesheetStatus(timesheet_id, status))?;

                self.notification_service
                    .notify_timesheet_queried(&job, &queried)
                    .await;

                Ok(queried)
            }
        }
    }

    /// Agency answers a query, either adjusting the hours or standing by
    /// the original submission with an explanation. Either way the
    /// timesheet returns to the customer for approval.
    pub async fn respond_to_query(
        &self,
        agency_user_id: Uuid,
        timesheet_id: Uuid,
        response_note: String,
        mode: RespondMode,
        adjusted_hours: Option<BigDecimal>,
    ) -> Result<Timesheet, ServiceError> {
        if response_note.trim().is_empty() {
            return Err(ServiceError::Validation(
                "A response must carry a note".to_string(),
            ));
        }

        let adjusted_hours = match mode {
            RespondMode::Adjust => {
                let hours = adjusted_hours.ok_or(ServiceError::InvalidHours(
                    "Adjusted hours are required when adjusting".to_string(),
                ))?;
                validate_submitted_hours(&hours)?;
                Some(hours)
            }
            RespondMode::Respond => None,
        };

        let (timesheet, job) = self.load_timesheet_and_job(timesheet_id).await?;

        if job.agency_id != agency_user_id {
            return Err(ServiceError::NotAuthorized(agency_user_id, job.id));
        }
        let status = timesheet.status.unwrap_or(TimesheetStatus::Submitted);
        if !status.can_respond() {
            return Err(ServiceError::WrongTimesheetStatus(timesheet_id, status));
        }

        let deadline = Utc::now() + Duration::hours(QUERY_RESPONSE_WINDOW_HOURS);
        let resubmitted = self
            .db_client
            .mark_timesheet_resubmitted(timesheet_id, response_note, adjusted_hours, deadline)
            .await?
            .ok_or(ServiceError::WrongTimesheetStatus(timesheet_id, status))?;

        self.notification_service
            .notify_timesheet_responded(&job, &resubmitted)
            .await;

        Ok(resubmitted)
    }

    /// Background sweep over timesheets whose response window has passed.
    /// With the setting at "off" the deadline stays advisory and the sweep
    /// only reports; "auto_settle" approves each overdue timesheet, taking
    /// the customer's suggested hours when the agency never answered.
    pub async fn expire_overdue_queries(&self) -> Result<usize, ServiceError> {
        let action = self
            .db_client
            .get_setting_or(QUERY_EXPIRY_ACTION, DEFAULT_QUERY_EXPIRY_ACTION)
            .await?;

        let overdue = self
            .db_client
            .get_overdue_queried_timesheets(Utc::now())
            .await?;

        if overdue.is_empty() {
            return Ok(0);
        }

        if action != "auto_settle" {
            tracing::info!(
                "{} timesheet(s) past their response deadline (sweep action: {})",
                overdue.len(),
                action
            );
            return Ok(0);
        }

        let mut settled = 0;
        for timesheet in overdue {
            match self.auto_settle(&timesheet).await {
                Ok(()) => settled += 1,
                Err(e) => {
                    tracing::warn!("Failed to auto-settle timesheet {}: {}", timesheet.id, e);
                }
            }
        }

        Ok(settled)
    }

    async fn auto_settle(&self, timesheet: &Timesheet) -> Result<(), ServiceError> {
        let job = self
            .db_client
            .get_job_by_id(timesheet.job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(timesheet.job_id))?;

        // Agency never answered the query: settle at the customer's
        // suggested hours if they gave any.
        let adjusted = match timesheet.status {
            Some(TimesheetStatus::Queried) => timesheet.suggested_hours.clone(),
            _ => None,
        };

        let (_, amount) = self.settle(&job, timesheet.id, adjusted).await?;

        tracing::info!(
            "Auto-settled overdue timesheet {} for {}",
            timesheet.id,
            amount
        );

        self.notification_service
            .notify_timesheet_approved(&job, &amount)
            .await;

        Ok(())
    }

    async fn settle(
        &self,
        job: &Job,
        timesheet_id: Uuid,
        adjusted_hours: Option<BigDecimal>,
    ) -> Result<(Timesheet, BigDecimal), ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        if let Some(hours) = adjusted_hours {
            self.db_client
                .set_timesheet_adjusted_hours(&mut tx, timesheet_id, hours)
                .await?;
        }

        let approved = self.db_client.approve_timesheet(&mut tx, timesheet_id).await?;
        let Some(approved) = approved else {
            tx.rollback().await?;
            // Lost a race; report the state we saw going in.
            let current = self
                .db_client
                .get_timesheet_by_id(timesheet_id)
                .await?
                .ok_or(ServiceError::TimesheetNotFound(timesheet_id))?;
            return Err(ServiceError::WrongTimesheetStatus(
                timesheet_id,
                current.status.unwrap_or(TimesheetStatus::Approved),
            ));
        };

        let amount = payment_amount(&approved.effective_hours(), &job.locked_hourly_rate);
        self.db_client
            .insert_payment(&mut tx, job.id, Some(timesheet_id), amount.clone())
            .await?;
        self.db_client.recompute_job_total_paid(&mut tx, job.id).await?;

        tx.commit().await?;

        Ok((approved, amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn payment_uses_locked_rate_and_full_precision() {
        let hours = BigDecimal::from(18);
        let rate = BigDecimal::from_str("20.00").unwrap();
        assert_eq!(
            payment_amount(&hours, &rate),
            BigDecimal::from_str("360.00").unwrap()
        );

        let fractional_hours = BigDecimal::from_str("17.5").unwrap();
        let odd_rate = BigDecimal::from_str("21.33").unwrap();
        assert_eq!(
            payment_amount(&fractional_hours, &odd_rate),
            BigDecimal::from_str("373.275").unwrap()
        );
    }

    #[test]
    fn weekly_hours_bounds() {
        assert!(validate_submitted_hours(&BigDecimal::from(40)).is_ok());
        assert!(validate_submitted_hours(&BigDecimal::from(168)).is_ok());
        assert!(matches!(
            validate_submitted_hours(&BigDecimal::zero()),
            Err(ServiceError::InvalidHours(_))
        ));
        assert!(matches!(
            validate_submitted_hours(&BigDecimal::from(169)),
            Err(ServiceError::InvalidHours(_))
        ));
    }

    #[test]
    fn respond_mode_parsing() {
        assert_eq!(RespondMode::parse("adjust").unwrap(), RespondMode::Adjust);
        assert_eq!(RespondMode::parse("respond").unwrap(), RespondMode::Respond);
        assert!(RespondMode::parse("accept").is_err());
    }

    #[derive(Debug)]
    struct DuplicateKey;

    impl std::fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for DuplicateKey {}

    impl sqlx::error::DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn duplicate_week_submission_is_a_validation_error() {
        let week = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mapped = map_submit_error(week, sqlx::Error::Database(Box::new(DuplicateKey)));
        match mapped {
            ServiceError::Validation(message) => {
                assert!(message.contains("01 January 2024"));
                assert!(message.contains("already been submitted"));
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn other_insert_failures_stay_database_errors() {
        let week = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            map_submit_error(week, sqlx::Error::RowNotFound),
            ServiceError::Database(_)
        ));
    }
}
