use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{caredb::CareExt, db::DBClient},
    models::caremodel::{Contract, JobStatus, SigningState},
    service::{error::ServiceError, notification_service::NotificationService},
};

/// Rate agreement signing. The agreement text itself is captured at bid
/// acceptance; this service only records signatures and advances the job
/// once both parties have signed.
#[derive(Debug, Clone)]
pub struct ContractService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
}

impl ContractService {
    pub fn new(db_client: Arc<DBClient>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            db_client,
            notification_service,
        }
    }

    pub async fn get_contract(
        &self,
        caller_id: Uuid,
        contract_id: Uuid,
    ) -> Result<Contract, ServiceError> {
        let contract = self
            .db_client
            .get_contract_by_id(contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(contract_id))?;

        if !contract.is_party(caller_id) {
            return Err(ServiceError::NotAParty(caller_id, contract_id));
        }

        Ok(contract)
    }

    pub async fn get_contract_for_job(
        &self,
        caller_id: Uuid,
        job_id: Uuid,
    ) -> Result<Contract, ServiceError> {
        let contract = self
            .db_client
            .get_contract_by_job_id(job_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(job_id))?;

        if !contract.is_party(caller_id) {
            return Err(ServiceError::NotAParty(caller_id, contract.id));
        }

        Ok(contract)
    }

    /// Records the caller's signature. When this signature completes the
    /// pair, the job moves from pending to assessment_pending in the same
    /// transaction.
    pub async fn sign_contract(
        &self,
        caller_id: Uuid,
        contract_id: Uuid,
    ) -> Result<Contract, ServiceError> {
        let contract = self
            .db_client
            .get_contract_by_id(contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(contract_id))?;

        if !contract.is_party(caller_id) {
            return Err(ServiceError::NotAParty(caller_id, contract_id));
        }
        if contract.has_signed(caller_id) {
            return Err(ServiceError::AlreadySigned(caller_id, contract_id));
        }

        let as_customer = caller_id == contract.customer_id;

        let mut tx = self.db_client.pool.begin().await?;

        let signed = self
            .db_client
            .record_signature(&mut tx, contract_id, as_customer)
            .await?;
        let Some(signed) = signed else {
            // Lost a race with a duplicate sign request.
            tx.rollback().await?;
            return Err(ServiceError::AlreadySigned(caller_id, contract_id));
        };

        let fully_signed = signed.signing_state() == SigningState::FullySigned;
        if fully_signed {
            self.db_client
                .update_job_status_tx(
                    &mut tx,
                    signed.job_id,
                    JobStatus::Pending,
                    JobStatus::AssessmentPending,
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Contract {} signed by {} ({})",
            contract_id,
            caller_id,
            if as_customer { "customer" } else { "agency" }
        );

        if fully_signed {
            if let Ok(Some(job)) = self.db_client.get_job_by_id(signed.job_id).await {
                self.notification_service
                    .notify_contract_fully_signed(&job)
                    .await;
            }
        } else {
            self.notification_service
                .notify_waiting_on_counterparty(caller_id, signed.job_id)
                .await;
        }

        Ok(signed)
    }
}
