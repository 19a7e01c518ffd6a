use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{types::BigDecimal, Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::caremodel::*;

/// Persistence surface for the marketplace workflow. Steps that must commit
/// together (bid acceptance, timesheet approval) take an open transaction.
#[async_trait]
pub trait CareExt {
    // Agency profiles
    async fn create_agency_profile(
        &self,
        user_id: Uuid,
        agency_name: String,
        cqc_provider_id: Option<String>,
        cqc_location_id: Option<String>,
        postcode: String,
        service_radius_miles: i32,
    ) -> Result<AgencyProfile, Error>;

    async fn get_agency_profile_by_user(&self, user_id: Uuid)
        -> Result<Option<AgencyProfile>, Error>;

    async fn get_agency_profile_by_id(&self, profile_id: Uuid)
        -> Result<Option<AgencyProfile>, Error>;

    async fn update_agency_profile(
        &self,
        user_id: Uuid,
        agency_name: String,
        cqc_provider_id: Option<String>,
        cqc_location_id: Option<String>,
        postcode: String,
        service_radius_miles: i32,
    ) -> Result<Option<AgencyProfile>, Error>;

    // Care requests
    #[allow(clippy::too_many_arguments)]
    async fn create_care_request(
        &self,
        customer_id: Uuid,
        postcode: String,
        latitude: Option<f64>,
        longitude: Option<f64>,
        care_types: Vec<String>,
        hours_per_week: BigDecimal,
        frequency: String,
        nights_per_week: Option<i32>,
        night_type: Option<NightType>,
        recipient_name: String,
        recipient_dob: NaiveDate,
        recipient_address: String,
        recipient_relationship: String,
        bid_deadline: DateTime<Utc>,
    ) -> Result<CareRequest, Error>;

    async fn get_care_request_by_id(&self, request_id: Uuid)
        -> Result<Option<CareRequest>, Error>;

    async fn get_customer_requests(&self, customer_id: Uuid) -> Result<Vec<CareRequest>, Error>;

    async fn get_open_requests(&self) -> Result<Vec<CareRequest>, Error>;

    async fn update_request_status(
        &self,
        request_id: Uuid,
        status: RequestStatus,
    ) -> Result<CareRequest, Error>;

    /// On-demand reconciliation of the lowest-rate ratchet. Never applied
    /// automatically: the stored column is an optimistic floor.
    async fn recompute_lowest_active_rate(
        &self,
        request_id: Uuid,
    ) -> Result<Option<BigDecimal>, Error>;

    // Bids
    async fn insert_bid(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        request_id: Uuid,
        agency_user_id: Uuid,
        agency_profile_id: Uuid,
        hourly_rate: BigDecimal,
        overnight_rate: Option<BigDecimal>,
        notes: Option<String>,
    ) -> Result<Bid, Error>;

    async fn bump_request_bid_stats(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        request_id: Uuid,
        hourly_rate: &BigDecimal,
    ) -> Result<(), Error>;

    async fn get_bid_by_id(&self, bid_id: Uuid) -> Result<Option<Bid>, Error>;

    async fn get_bids_for_request(&self, request_id: Uuid) -> Result<Vec<Bid>, Error>;

    /// Optimistic acceptance guard: only flips an `open` request. A
    /// concurrent second acceptance sees no row and must fail.
    async fn mark_request_accepted(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        request_id: Uuid,
        bid_id: Uuid,
    ) -> Result<Option<CareRequest>, Error>;

    async fn set_bid_status(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        bid_id: Uuid,
        status: BidStatus,
    ) -> Result<Bid, Error>;

    async fn reject_sibling_bids(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        request_id: Uuid,
        winning_bid_id: Uuid,
    ) -> Result<u64, Error>;

    async fn withdraw_bid(
        &self,
        bid_id: Uuid,
        agency_user_id: Uuid,
    ) -> Result<Option<Bid>, Error>;

    // Jobs
    #[allow(clippy::too_many_arguments)]
    async fn insert_job(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        care_request_id: Uuid,
        winning_bid_id: Uuid,
        customer_id: Uuid,
        agency_id: Uuid,
        agency_profile_id: Uuid,
        locked_hourly_rate: BigDecimal,
        agreed_hours_per_week: BigDecimal,
    ) -> Result<Job, Error>;

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    async fn get_jobs_for_user(&self, user_id: Uuid) -> Result<Vec<Job>, Error>;

    /// Optimistic status transition: succeeds only from the expected source
    /// state.
    async fn update_job_status_guarded(
        &self,
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<Option<Job>, Error>;

    async fn update_job_status_tx(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<Option<Job>, Error>;

    async fn complete_assessment(
        &self,
        job_id: Uuid,
        start_date: Option<NaiveDate>,
    ) -> Result<Option<Job>, Error>;

    async fn set_job_start_date(
        &self,
        job_id: Uuid,
        start_date: Option<NaiveDate>,
    ) -> Result<Job, Error>;

    async fn recompute_job_total_paid(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        job_id: Uuid,
    ) -> Result<Job, Error>;

    // Contracts
    async fn insert_contract(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        job_id: Uuid,
        customer_id: Uuid,
        agency_id: Uuid,
        agreement_text: String,
    ) -> Result<Contract, Error>;

    async fn get_contract_by_id(&self, contract_id: Uuid) -> Result<Option<Contract>, Error>;

    async fn get_contract_by_job_id(&self, job_id: Uuid) -> Result<Option<Contract>, Error>;

    /// Sets the caller's agreement timestamp only if still unset, so a
    /// repeated sign never produces a second write.
    async fn record_signature(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        contract_id: Uuid,
        as_customer: bool,
    ) -> Result<Option<Contract>, Error>;

    // Timesheets
    async fn insert_timesheet(
        &self,
        job_id: Uuid,
        submitted_by: Uuid,
        week_starting: NaiveDate,
        hours_worked: BigDecimal,
        notes: Option<String>,
    ) -> Result<Timesheet, Error>;

    async fn get_timesheet_by_id(&self, timesheet_id: Uuid) -> Result<Option<Timesheet>, Error>;

    async fn get_timesheets_for_job(&self, job_id: Uuid) -> Result<Vec<Timesheet>, Error>;

    async fn approve_timesheet(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        timesheet_id: Uuid,
    ) -> Result<Option<Timesheet>, Error>;

    async fn mark_timesheet_queried(
        &self,
        timesheet_id: Uuid,
        query_note: String,
        suggested_hours: Option<BigDecimal>,
        response_deadline: DateTime<Utc>,
    ) -> Result<Option<Timesheet>, Error>;

    async fn escalate_timesheet(&self, timesheet_id: Uuid) -> Result<Option<Timesheet>, Error>;

    async fn mark_timesheet_resubmitted(
        &self,
        timesheet_id: Uuid,
        query_response: String,
        adjusted_hours: Option<BigDecimal>,
        response_deadline: DateTime<Utc>,
    ) -> Result<Option<Timesheet>, Error>;

    async fn set_timesheet_adjusted_hours(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        timesheet_id: Uuid,
        adjusted_hours: BigDecimal,
    ) -> Result<Timesheet, Error>;

    async fn get_overdue_queried_timesheets(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Timesheet>, Error>;

    // Payments
    async fn insert_payment(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        job_id: Uuid,
        timesheet_id: Option<Uuid>,
        amount: BigDecimal,
    ) -> Result<Payment, Error>;

    async fn get_payments_for_job(&self, job_id: Uuid) -> Result<Vec<Payment>, Error>;

    async fn mark_payment_paid(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;
}

#[async_trait]
impl CareExt for DBClient {
    async fn create_agency_profile(
        &self,
        user_id: Uuid,
        agency_name: String,
        cqc_provider_id: Option<String>,
        cqc_location_id: Option<String>,
        postcode: String,
        service_radius_miles: i32,
    ) -> Result<AgencyProfile, Error> {
        sqlx::query_as::<_, AgencyProfile>(
            r#"
            INSERT INTO agency_profiles
            (user_id, agency_name, cqc_provider_id, cqc_location_id, postcode, service_radius_miles)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(agency_name)
        .bind(cqc_provider_id)
        .bind(cqc_location_id)
        .bind(postcode)
        .bind(service_radius_miles)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_agency_profile_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<AgencyProfile>, Error> {
        sqlx::query_as::<_, AgencyProfile>("SELECT * FROM agency_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_agency_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<AgencyProfile>, Error> {
        sqlx::query_as::<_, AgencyProfile>("SELECT * FROM agency_profiles WHERE id = $1")
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_agency_profile(
        &self,
        user_id: Uuid,
        agency_name: String,
        cqc_provider_id: Option<String>,
        cqc_location_id: Option<String>,
        postcode: String,
        service_radius_miles: i32,
    ) -> Result<Option<AgencyProfile>, Error> {
        sqlx::query_as::<_, AgencyProfile>(
            r#"
            UPDATE agency_profiles
            SET agency_name = $2,
                cqc_provider_id = $3,
                cqc_location_id = $4,
                postcode = $5,
                service_radius_miles = $6,
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(agency_name)
        .bind(cqc_provider_id)
        .bind(cqc_location_id)
        .bind(postcode)
        .bind(service_radius_miles)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_care_request(
        &self,
        customer_id: Uuid,
        postcode: String,
        latitude: Option<f64>,
        longitude: Option<f64>,
        care_types: Vec<String>,
        hours_per_week: BigDecimal,
        frequency: String,
        nights_per_week: Option<i32>,
        night_type: Option<NightType>,
        recipient_name: String,
        recipient_dob: NaiveDate,
        recipient_address: String,
        recipient_relationship: String,
        bid_deadline: DateTime<Utc>,
    ) -> Result<CareRequest, Error> {
        sqlx::query_as::<_, CareRequest>(
            r#"
            INSERT INTO care_requests
            (customer_id, postcode, latitude, longitude, care_types, hours_per_week,
             frequency, nights_per_week, night_type, recipient_name, recipient_dob,
             recipient_address, recipient_relationship, bid_deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(postcode)
        .bind(latitude)
        .bind(longitude)
        .bind(care_types)
        .bind(hours_per_week)
        .bind(frequency)
        .bind(nights_per_week)
        .bind(night_type)
        .bind(recipient_name)
        .bind(recipient_dob)
        .bind(recipient_address)
        .bind(recipient_relationship)
        .bind(bid_deadline)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_care_request_by_id(
        &self,
        request_id: Uuid,
    ) -> Result<Option<CareRequest>, Error> {
        sqlx::query_as::<_, CareRequest>("SELECT * FROM care_requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_customer_requests(&self, customer_id: Uuid) -> Result<Vec<CareRequest>, Error> {
        sqlx::query_as::<_, CareRequest>(
            "SELECT * FROM care_requests WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_open_requests(&self) -> Result<Vec<CareRequest>, Error> {
        sqlx::query_as::<_, CareRequest>(
            "SELECT * FROM care_requests WHERE status = 'open' ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn update_request_status(
        &self,
        request_id: Uuid,
        status: RequestStatus,
    ) -> Result<CareRequest, Error> {
        sqlx::query_as::<_, CareRequest>(
            "UPDATE care_requests SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(request_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn recompute_lowest_active_rate(
        &self,
        request_id: Uuid,
    ) -> Result<Option<BigDecimal>, Error> {
        sqlx::query_scalar::<_, Option<BigDecimal>>(
            "SELECT MIN(hourly_rate) FROM bids WHERE care_request_id = $1 AND status = 'active'",
        )
        .bind(request_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn insert_bid(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        request_id: Uuid,
        agency_user_id: Uuid,
        agency_profile_id: Uuid,
        hourly_rate: BigDecimal,
        overnight_rate: Option<BigDecimal>,
        notes: Option<String>,
    ) -> Result<Bid, Error> {
        sqlx::query_as::<_, Bid>(
            r#"
            INSERT INTO bids
            (care_request_id, agency_user_id, agency_profile_id, hourly_rate, overnight_rate, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(agency_user_id)
        .bind(agency_profile_id)
        .bind(hourly_rate)
        .bind(overnight_rate)
        .bind(notes)
        .fetch_one(&mut **tx)
        .await
    }

    async fn bump_request_bid_stats(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        request_id: Uuid,
        hourly_rate: &BigDecimal,
    ) -> Result<(), Error> {
        // lowest_bid_rate is a monotonic ratchet: only ever lowered, never
        // recomputed when bids are withdrawn or rejected.
        sqlx::query(
            r#"
            UPDATE care_requests
            SET bids_count = COALESCE(bids_count, 0) + 1,
                lowest_bid_rate = LEAST(COALESCE(lowest_bid_rate, $2), $2),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(request_id)
        .bind(hourly_rate)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn get_bid_by_id(&self, bid_id: Uuid) -> Result<Option<Bid>, Error> {
        sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE id = $1")
            .bind(bid_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_bids_for_request(&self, request_id: Uuid) -> Result<Vec<Bid>, Error> {
        sqlx::query_as::<_, Bid>(
            "SELECT * FROM bids WHERE care_request_id = $1 ORDER BY created_at ASC",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_request_accepted(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        request_id: Uuid,
        bid_id: Uuid,
    ) -> Result<Option<CareRequest>, Error> {
        sqlx::query_as::<_, CareRequest>(
            r#"
            UPDATE care_requests
            SET status = 'accepted', winning_bid_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'open'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(bid_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn set_bid_status(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        bid_id: Uuid,
        status: BidStatus,
    ) -> Result<Bid, Error> {
        sqlx::query_as::<_, Bid>("UPDATE bids SET status = $2 WHERE id = $1 RETURNING *")
            .bind(bid_id)
            .bind(status)
            .fetch_one(&mut **tx)
            .await
    }

    async fn reject_sibling_bids(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        request_id: Uuid,
        winning_bid_id: Uuid,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE bids
            SET status = 'rejected'
            WHERE care_request_id = $1 AND id <> $2 AND status = 'active'
            "#,
        )
        .bind(request_id)
        .bind(winning_bid_id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn withdraw_bid(
        &self,
        bid_id: Uuid,
        agency_user_id: Uuid,
    ) -> Result<Option<Bid>, Error> {
        sqlx::query_as::<_, Bid>(
            r#"
            UPDATE bids
            SET status = 'withdrawn'
            WHERE id = $1 AND agency_user_id = $2 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(bid_id)
        .bind(agency_user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_job(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        care_request_id: Uuid,
        winning_bid_id: Uuid,
        customer_id: Uuid,
        agency_id: Uuid,
        agency_profile_id: Uuid,
        locked_hourly_rate: BigDecimal,
        agreed_hours_per_week: BigDecimal,
    ) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs
            (care_request_id, winning_bid_id, customer_id, agency_id, agency_profile_id,
             locked_hourly_rate, agreed_hours_per_week)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(care_request_id)
        .bind(winning_bid_id)
        .bind(customer_id)
        .bind(agency_id)
        .bind(agency_profile_id)
        .bind(locked_hourly_rate)
        .bind(agreed_hours_per_week)
        .fetch_one(&mut **tx)
        .await
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_jobs_for_user(&self, user_id: Uuid) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE customer_id = $1 OR agency_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_job_status_guarded(
        &self,
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_job_status_tx(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn complete_assessment(
        &self,
        job_id: Uuid,
        start_date: Option<NaiveDate>,
    ) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = 'assessment_complete', start_date = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'assessment_pending'
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(start_date)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_job_start_date(
        &self,
        job_id: Uuid,
        start_date: Option<NaiveDate>,
    ) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET start_date = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(job_id)
        .bind(start_date)
        .fetch_one(&self.pool)
        .await
    }

    async fn recompute_job_total_paid(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        job_id: Uuid,
    ) -> Result<Job, Error> {
        // Derived cache: always the sum of this job's payment ledger, never
        // an ad-hoc increment.
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET total_paid_to_date = (
                    SELECT COALESCE(SUM(amount), 0) FROM payments WHERE job_id = $1
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .fetch_one(&mut **tx)
        .await
    }

    async fn insert_contract(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        job_id: Uuid,
        customer_id: Uuid,
        agency_id: Uuid,
        agreement_text: String,
    ) -> Result<Contract, Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            INSERT INTO contracts (job_id, customer_id, agency_id, agreement_text)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(customer_id)
        .bind(agency_id)
        .bind(agreement_text)
        .fetch_one(&mut **tx)
        .await
    }

    async fn get_contract_by_id(&self, contract_id: Uuid) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE id = $1")
            .bind(contract_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_contract_by_job_id(&self, job_id: Uuid) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn record_signature(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        contract_id: Uuid,
        as_customer: bool,
    ) -> Result<Option<Contract>, Error> {
        let query = if as_customer {
            r#"
            UPDATE contracts
            SET customer_agreed_at = NOW()
            WHERE id = $1 AND customer_agreed_at IS NULL
            RETURNING *
            "#
        } else {
            r#"
            UPDATE contracts
            SET agency_agreed_at = NOW()
            WHERE id = $1 AND agency_agreed_at IS NULL
            RETURNING *
            "#
        };

        sqlx::query_as::<_, Contract>(query)
            .bind(contract_id)
            .fetch_optional(&mut **tx)
            .await
    }

    async fn insert_timesheet(
        &self,
        job_id: Uuid,
        submitted_by: Uuid,
        week_starting: NaiveDate,
        hours_worked: BigDecimal,
        notes: Option<String>,
    ) -> Result<Timesheet, Error> {
        sqlx::query_as::<_, Timesheet>(
            r#"
            INSERT INTO timesheets (job_id, submitted_by, week_starting, hours_worked, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(submitted_by)
        .bind(week_starting)
        .bind(hours_worked)
        .bind(notes)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_timesheet_by_id(&self, timesheet_id: Uuid) -> Result<Option<Timesheet>, Error> {
        sqlx::query_as::<_, Timesheet>("SELECT * FROM timesheets WHERE id = $1")
            .bind(timesheet_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_timesheets_for_job(&self, job_id: Uuid) -> Result<Vec<Timesheet>, Error> {
        sqlx::query_as::<_, Timesheet>(
            "SELECT * FROM timesheets WHERE job_id = $1 ORDER BY week_starting DESC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn approve_timesheet(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        timesheet_id: Uuid,
    ) -> Result<Option<Timesheet>, Error> {
        sqlx::query_as::<_, Timesheet>(
            r#"
            UPDATE timesheets
            SET status = 'approved', approved_at = NOW()
            WHERE id = $1 AND status IN ('submitted', 'queried', 'resubmitted')
            RETURNING *
            "#,
        )
        .bind(timesheet_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn mark_timesheet_queried(
        &self,
        timesheet_id: Uuid,
        query_note: String,
        suggested_hours: Option<BigDecimal>,
        response_deadline: DateTime<Utc>,
    ) -> Result<Option<Timesheet>, Error> {
        sqlx::query_as::<_, Timesheet>(
            r#"
            UPDATE timesheets
            SET status = 'queried',
                query_note = $2,
                suggested_hours = $3,
                queried_at = NOW(),
                response_deadline = $4,
                query_count = COALESCE(query_count, 0) + 1
            WHERE id = $1 AND status IN ('submitted', 'resubmitted')
            RETURNING *
            "#,
        )
        .bind(timesheet_id)
        .bind(query_note)
        .bind(suggested_hours)
        .bind(response_deadline)
        .fetch_optional(&self.pool)
        .await
    }

    async fn escalate_timesheet(&self, timesheet_id: Uuid) -> Result<Option<Timesheet>, Error> {
        // The queried/deadline fields are deliberately left untouched: the
        // capped third query bypasses the 24h response flow entirely.
        sqlx::query_as::<_, Timesheet>(
            r#"
            UPDATE timesheets
            SET status = 'escalated',
                query_count = COALESCE(query_count, 0) + 1
            WHERE id = $1 AND status IN ('submitted', 'resubmitted')
            RETURNING *
            "#,
        )
        .bind(timesheet_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_timesheet_resubmitted(
        &self,
        timesheet_id: Uuid,
        query_response: String,
        adjusted_hours: Option<BigDecimal>,
        response_deadline: DateTime<Utc>,
    ) -> Result<Option<Timesheet>, Error> {
        sqlx::query_as::<_, Timesheet>(
            r#"
            UPDATE timesheets
            SET status = 'resubmitted',
                query_response = $2,
                adjusted_hours = COALESCE($3, adjusted_hours),
                response_deadline = $4
            WHERE id = $1 AND status = 'queried'
            RETURNING *
            "#,
        )
        .bind(timesheet_id)
        .bind(query_response)
        .bind(adjusted_hours)
        .bind(response_deadline)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_timesheet_adjusted_hours(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        timesheet_id: Uuid,
        adjusted_hours: BigDecimal,
    ) -> Result<Timesheet, Error> {
        sqlx::query_as::<_, Timesheet>(
            "UPDATE timesheets SET adjusted_hours = $2 WHERE id = $1 RETURNING *",
        )
        .bind(timesheet_id)
        .bind(adjusted_hours)
        .fetch_one(&mut **tx)
        .await
    }

    async fn get_overdue_queried_timesheets(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Timesheet>, Error> {
        sqlx::query_as::<_, Timesheet>(
            r#"
            SELECT * FROM timesheets
            WHERE status IN ('queried', 'resubmitted')
              AND response_deadline IS NOT NULL
              AND response_deadline < $1
            ORDER BY response_deadline ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    async fn insert_payment(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        job_id: Uuid,
        timesheet_id: Option<Uuid>,
        amount: BigDecimal,
    ) -> Result<Payment, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (job_id, timesheet_id, amount)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(timesheet_id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await
    }

    async fn get_payments_for_job(&self, job_id: Uuid) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE job_id = $1 ORDER BY created_at ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_payment_paid(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = 'paid', paid_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }
}
