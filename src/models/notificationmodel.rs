use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub r#type: String,
    pub message: String,
    pub related_job_id: Option<Uuid>,
    pub related_request_id: Option<Uuid>,
    pub is_read: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}
