use std::sync::Arc;

use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, userdb::UserExt},
    mail::mails,
    models::{
        caremodel::{display_money, Job, Timesheet},
        notificationmodel::Notification,
    },
    service::error::ServiceError,
};

/// Append-only notification sink plus the email dispatch gateway. Everything
/// here is fire-and-forget: callers invoke these after their transaction has
/// committed, and a failed insert or send is logged, never surfaced.
#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
    app_url: String,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>, app_url: String) -> Self {
        Self { db_client, app_url }
    }

    async fn store_notification(
        &self,
        recipient_id: Uuid,
        notification_type: &str,
        message: String,
        related_job_id: Option<Uuid>,
        related_request_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO notifications
            (recipient_id, type, message, related_job_id, related_request_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(recipient_id)
        .bind(notification_type)
        .bind(message)
        .bind(related_job_id)
        .bind(related_request_id)
        .execute(&self.db_client.pool)
        .await?;

        Ok(())
    }

    async fn notify(
        &self,
        recipient_id: Uuid,
        notification_type: &str,
        message: String,
        related_job_id: Option<Uuid>,
        related_request_id: Option<Uuid>,
    ) {
        if let Err(e) = self
            .store_notification(
                recipient_id,
                notification_type,
                message,
                related_job_id,
                related_request_id,
            )
            .await
        {
            tracing::warn!(
                "Failed to store {} notification for {}: {}",
                notification_type,
                recipient_id,
                e
            );
        }
    }

    /// The gateway resolves the address from the identity store itself; raw
    /// email addresses never travel through the workflow services.
    async fn resolve_recipient(&self, user_id: Uuid) -> Option<(String, String)> {
        match self.db_client.get_user(Some(user_id), None).await {
            Ok(Some(user)) => Some((user.email, user.name)),
            Ok(None) => {
                tracing::warn!("Email recipient {} no longer exists", user_id);
                None
            }
            Err(e) => {
                tracing::warn!("Failed to resolve email recipient {}: {}", user_id, e);
                None
            }
        }
    }

    fn job_url(&self, job_id: Uuid) -> String {
        format!("{}/jobs/{}", self.app_url, job_id)
    }

    // Bid ledger events

    pub async fn notify_new_bid(&self, customer_id: Uuid, request_id: Uuid, rate: &BigDecimal) {
        self.notify(
            customer_id,
            "new_bid",
            format!(
                "A new bid of {} per hour has been placed on your care request",
                display_money(rate)
            ),
            None,
            Some(request_id),
        )
        .await;
    }

    pub async fn notify_bid_accepted(&self, job: &Job) {
        self.notify(
            job.agency_id,
            "bid_accepted",
            "Your bid was accepted. Please review and sign the rate agreement".to_string(),
            Some(job.id),
            None,
        )
        .await;
    }

    // Rate agreement events

    pub async fn notify_waiting_on_counterparty(&self, caller_id: Uuid, job_id: Uuid) {
        self.notify(
            caller_id,
            "contract_signed_waiting",
            "You have signed the rate agreement. Waiting for the other party to sign".to_string(),
            Some(job_id),
            None,
        )
        .await;
    }

    pub async fn notify_contract_fully_signed(&self, job: &Job) {
        for recipient in [job.customer_id, job.agency_id] {
            self.notify(
                recipient,
                "contract_fully_signed",
                "The rate agreement is fully signed. The care assessment can now be arranged"
                    .to_string(),
                Some(job.id),
                None,
            )
            .await;
        }
    }

    // Job lifecycle events

    pub async fn notify_assessment_complete(&self, job: &Job) {
        self.notify(
            job.customer_id,
            "assessment_complete",
            "The agency has completed the care assessment".to_string(),
            Some(job.id),
            None,
        )
        .await;
    }

    pub async fn notify_start_date_status(&self, job: &Job) {
        match job.start_date {
            Some(date) => {
                self.notify(
                    job.customer_id,
                    "start_date_set",
                    format!("Care start date confirmed as {}", date.format("%d %B %Y")),
                    Some(job.id),
                    None,
                )
                .await;
            }
            None => {
                self.notify(
                    job.customer_id,
                    "start_date_tbc",
                    "Care start date is still to be confirmed".to_string(),
                    Some(job.id),
                    None,
                )
                .await;
            }
        }
    }

    pub async fn notify_care_confirmed(&self, job: &Job) {
        self.notify(
            job.agency_id,
            "care_confirmed",
            "The customer has confirmed care. The job is now active and billable".to_string(),
            Some(job.id),
            None,
        )
        .await;
    }

    pub async fn notify_care_declined(&self, job: &Job) {
        self.notify(
            job.agency_id,
            "care_declined",
            "The customer has declined to proceed with care. No charges apply".to_string(),
            Some(job.id),
            None,
        )
        .await;
    }

    /// Both parties get an in-app notification with actor-dependent wording;
    /// only the party who did not act gets the email.
    pub async fn notify_pre_care_cancelled(&self, job: &Job, acting_user_id: Uuid) {
        let other_party = job.other_party(acting_user_id);

        self.notify(
            acting_user_id,
            "job_cancelled",
            "You have cancelled this job before care started".to_string(),
            Some(job.id),
            None,
        )
        .await;
        self.notify(
            other_party,
            "job_cancelled",
            "The other party has cancelled this job before care started".to_string(),
            Some(job.id),
            None,
        )
        .await;

        if let Some((email, name)) = self.resolve_recipient(other_party).await {
            if let Err(e) =
                mails::send_job_cancelled_email(&email, &name, &self.job_url(job.id)).await
            {
                tracing::warn!("Failed to send cancellation email to {}: {}", email, e);
            }
        }
    }

    // Timesheet settlement events

    pub async fn notify_timesheet_submitted(&self, job: &Job, timesheet: &Timesheet) {
        self.notify(
            job.customer_id,
            "timesheet_submitted",
            format!(
                "A timesheet for week starting {} is awaiting your approval",
                timesheet.week_starting.format("%d %B %Y")
            ),
            Some(job.id),
            None,
        )
        .await;
    }

    pub async fn notify_timesheet_queried(&self, job: &Job, timesheet: &Timesheet) {
        self.notify(
            job.agency_id,
            "timesheet_queried",
            format!(
                "The customer has queried the timesheet for week starting {}. You have 24 hours to respond",
                timesheet.week_starting.format("%d %B %Y")
            ),
            Some(job.id),
            None,
        )
        .await;

        if let Some((email, name)) = self.resolve_recipient(job.agency_id).await {
            if let Err(e) = mails::send_timesheet_query_email(
                &email,
                &name,
                &timesheet.week_starting.format("%d %B %Y").to_string(),
                timesheet.query_note.as_deref().unwrap_or(""),
                &self.job_url(job.id),
            )
            .await
            {
                tracing::warn!("Failed to send query email to {}: {}", email, e);
            }
        }
    }

    pub async fn notify_timesheet_responded(&self, job: &Job, timesheet: &Timesheet) {
        self.notify(
            job.customer_id,
            "timesheet_response",
            format!(
                "The agency has responded to your query on the timesheet for week starting {}",
                timesheet.week_starting.format("%d %B %Y")
            ),
            Some(job.id),
            None,
        )
        .await;

        if let Some((email, name)) = self.resolve_recipient(job.customer_id).await {
            if let Err(e) = mails::send_timesheet_response_email(
                &email,
                &name,
                &timesheet.week_starting.format("%d %B %Y").to_string(),
                timesheet.query_response.as_deref().unwrap_or(""),
                &self.job_url(job.id),
            )
            .await
            {
                tracing::warn!("Failed to send response email to {}: {}", email, e);
            }
        }
    }

    pub async fn notify_timesheet_approved(&self, job: &Job, amount: &BigDecimal) {
        self.notify(
            job.agency_id,
            "timesheet_approved",
            format!(
                "Timesheet approved. A payment of {} has been recorded",
                display_money(amount)
            ),
            Some(job.id),
            None,
        )
        .await;
    }

    pub async fn notify_timesheet_escalated(&self, job: &Job, timesheet: &Timesheet) {
        let message = format!(
            "The dispute over the timesheet for week starting {} has been escalated to CareBridge support",
            timesheet.week_starting.format("%d %B %Y")
        );
        for recipient in [job.customer_id, job.agency_id] {
            self.notify(
                recipient,
                "timesheet_escalated",
                message.clone(),
                Some(job.id),
                None,
            )
            .await;
        }
    }

    // Read surface (peripheral)

    pub async fn get_user_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, ServiceError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_client.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND recipient_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.db_client.pool)
            .await?;

        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<(), ServiceError> {
        sqlx::query(
            "UPDATE notifications SET is_read = true WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(&self.db_client.pool)
        .await?;

        Ok(())
    }
}
