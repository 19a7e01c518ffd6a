use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    db::{caredb::CareExt, db::DBClient},
    models::caremodel::{Job, JobStatus, Payment},
    service::{error::ServiceError, notification_service::NotificationService},
};

/// Agency-side operations reject anyone but the job's agency, including the
/// customer party.
fn ensure_agency_actor(job: &Job, caller_id: Uuid) -> Result<(), ServiceError> {
    if job.agency_id != caller_id {
        return Err(ServiceError::NotAuthorized(caller_id, job.id));
    }
    Ok(())
}

/// Job lifecycle: assessment, care confirmation, start date management,
/// pause/resume and the pre-care cancellation window.
#[derive(Debug, Clone)]
pub struct JobService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
}

impl JobService {
    pub fn new(db_client: Arc<DBClient>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            db_client,
            notification_service,
        }
    }

    async fn load_job_for_party(&self, caller_id: Uuid, job_id: Uuid) -> Result<Job, ServiceError> {
        let job = self
            .db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if !job.is_party(caller_id) {
            return Err(ServiceError::NotAuthorized(caller_id, job_id));
        }

        Ok(job)
    }

    pub async fn get_job(&self, caller_id: Uuid, job_id: Uuid) -> Result<Job, ServiceError> {
        self.load_job_for_party(caller_id, job_id).await
    }

    pub async fn list_jobs(&self, caller_id: Uuid) -> Result<Vec<Job>, ServiceError> {
        Ok(self.db_client.get_jobs_for_user(caller_id).await?)
    }

    pub async fn list_payments(
        &self,
        caller_id: Uuid,
        job_id: Uuid,
    ) -> Result<Vec<Payment>, ServiceError> {
        self.load_job_for_party(caller_id, job_id).await?;
        Ok(self.db_client.get_payments_for_job(job_id).await?)
    }

    /// Agency records the outcome of the in-home assessment. A start date is
    /// optional at this point; leaving it unset means "to be confirmed" and
    /// the customer is told either way.
    pub async fn mark_assessment_complete(
        &self,
        agency_user_id: Uuid,
        job_id: Uuid,
        start_date: Option<NaiveDate>,
    ) -> Result<Job, ServiceError> {
        let job = self.load_job_for_party(agency_user_id, job_id).await?;
        ensure_agency_actor(&job, agency_user_id)?;

        let updated = self
            .db_client
            .complete_assessment(job_id, start_date)
            .await?
            .ok_or_else(|| {
                ServiceError::WrongJobStatus(job_id, job.status.unwrap_or(JobStatus::Pending))
            })?;

        self.notification_service
            .notify_assessment_complete(&updated)
            .await;
        self.notification_service
            .notify_start_date_status(&updated)
            .await;

        Ok(updated)
    }

    pub async fn set_start_date(
        &self,
        agency_user_id: Uuid,
        job_id: Uuid,
        start_date: Option<NaiveDate>,
    ) -> Result<Job, ServiceError> {
        let job = self.load_job_for_party(agency_user_id, job_id).await?;
        ensure_agency_actor(&job, agency_user_id)?;

        let status = job.status.unwrap_or(JobStatus::Pending);
        if !status.allows_start_date_edit() {
            return Err(ServiceError::WrongJobStatus(job_id, status));
        }

        let updated = self.db_client.set_job_start_date(job_id, start_date).await?;

        self.notification_service
            .notify_start_date_status(&updated)
            .await;

        Ok(updated)
    }

    /// Customer confirms care after a completed assessment; billing starts
    /// here and the pre-care cancellation window closes.
    pub async fn confirm_care(
        &self,
        customer_id: Uuid,
        job_id: Uuid,
    ) -> Result<Job, ServiceError> {
        let job = self.load_job_for_party(customer_id, job_id).await?;
        if job.customer_id != customer_id {
            return Err(ServiceError::NotAuthorized(customer_id, job_id));
        }

        let updated = self
            .db_client
            .update_job_status_guarded(job_id, JobStatus::AssessmentComplete, JobStatus::Active)
            .await?
            .ok_or_else(|| {
                ServiceError::WrongJobStatus(job_id, job.status.unwrap_or(JobStatus::Pending))
            })?;

        self.notification_service.notify_care_confirmed(&updated).await;

        Ok(updated)
    }

    /// Customer declines to proceed after assessment. No charges apply.
    pub async fn decline_care(
        &self,
        customer_id: Uuid,
        job_id: Uuid,
    ) -> Result<Job, ServiceError> {
        let job = self.load_job_for_party(customer_id, job_id).await?;
        if job.customer_id != customer_id {
            return Err(ServiceError::NotAuthorized(customer_id, job_id));
        }

        let updated = self
            .db_client
            .update_job_status_guarded(
                job_id,
                JobStatus::AssessmentComplete,
                JobStatus::CancelledPreCare,
            )
            .await?
            .ok_or_else(|| {
                ServiceError::WrongJobStatus(job_id, job.status.unwrap_or(JobStatus::Pending))
            })?;

        self.notification_service.notify_care_declined(&updated).await;

        Ok(updated)
    }

    /// Either party may cancel while the job has not gone active.
    pub async fn cancel_pre_care(
        &self,
        caller_id: Uuid,
        job_id: Uuid,
    ) -> Result<Job, ServiceError> {
        let job = self.load_job_for_party(caller_id, job_id).await?;

        let status = job.status.unwrap_or(JobStatus::Pending);
        if !status.can_cancel_pre_care() {
            return Err(ServiceError::WrongJobStatus(job_id, status));
        }

        let updated = self
            .db_client
            .update_job_status_guarded(job_id, status, JobStatus::CancelledPreCare)
            .await?
            .ok_or(ServiceError::WrongJobStatus(job_id, status))?;

        tracing::info!("Job {} cancelled pre-care by {}", job_id, caller_id);

        self.notification_service
            .notify_pre_care_cancelled(&updated, caller_id)
            .await;

        Ok(updated)
    }

    /// Pausing billing is the agency's call, not the customer's.
    pub async fn pause_job(&self, caller_id: Uuid, job_id: Uuid) -> Result<Job, ServiceError> {
        let job = self.load_job_for_party(caller_id, job_id).await?;
        ensure_agency_actor(&job, caller_id)?;

        self.db_client
            .update_job_status_guarded(job_id, JobStatus::Active, JobStatus::Paused)
            .await?
            .ok_or_else(|| {
                ServiceError::WrongJobStatus(job_id, job.status.unwrap_or(JobStatus::Pending))
            })
    }

    pub async fn resume_job(&self, caller_id: Uuid, job_id: Uuid) -> Result<Job, ServiceError> {
        let job = self.load_job_for_party(caller_id, job_id).await?;
        ensure_agency_actor(&job, caller_id)?;

        self.db_client
            .update_job_status_guarded(job_id, JobStatus::Paused, JobStatus::Active)
            .await?
            .ok_or_else(|| {
                ServiceError::WrongJobStatus(job_id, job.status.unwrap_or(JobStatus::Pending))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::BigDecimal;

    fn active_job() -> Job {
        Job {
            id: Uuid::new_v4(),
            care_request_id: Uuid::new_v4(),
            winning_bid_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            agency_id: Uuid::new_v4(),
            agency_profile_id: Uuid::new_v4(),
            locked_hourly_rate: BigDecimal::from(20),
            agreed_hours_per_week: BigDecimal::from(14),
            start_date: None,
            status: Some(JobStatus::Active),
            total_paid_to_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn customer_cannot_act_as_agency() {
        let job = active_job();
        assert!(matches!(
            ensure_agency_actor(&job, job.customer_id),
            Err(ServiceError::NotAuthorized(_, _))
        ));
    }

    #[test]
    fn agency_passes_agency_guard() {
        let job = active_job();
        assert!(ensure_agency_actor(&job, job.agency_id).is_ok());
    }

    #[test]
    fn stranger_cannot_act_as_agency() {
        let job = active_job();
        assert!(matches!(
            ensure_agency_actor(&job, Uuid::new_v4()),
            Err(ServiceError::NotAuthorized(_, _))
        ));
    }
}
