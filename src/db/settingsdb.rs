use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Error;

use super::db::DBClient;

pub const BID_WINDOW_HOURS: &str = "bid_window_hours";
pub const MIN_BID_DECREMENT: &str = "min_bid_decrement";
pub const PLATFORM_FEE_PCT: &str = "platform_fee_pct";
pub const MAX_RADIUS_MILES: &str = "max_radius_miles";
pub const QUERY_EXPIRY_ACTION: &str = "query_expiry_action";

pub const DEFAULT_BID_WINDOW_HOURS: i64 = 72;
pub const DEFAULT_MAX_RADIUS_MILES: i64 = 50;
/// "off" keeps the 24h response deadline advisory; "auto_settle" lets the
/// background sweep settle overdue queries.
pub const DEFAULT_QUERY_EXPIRY_ACTION: &str = "off";

pub fn is_recognized_key(key: &str) -> bool {
    matches!(
        key,
        BID_WINDOW_HOURS
            | MIN_BID_DECREMENT
            | PLATFORM_FEE_PCT
            | MAX_RADIUS_MILES
            | QUERY_EXPIRY_ACTION
    )
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct AppSetting {
    pub key: String,
    pub value: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait SettingsExt {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, Error>;

    async fn get_i64_setting(&self, key: &str, default: i64) -> Result<i64, Error>;

    async fn get_setting_or(&self, key: &str, default: &str) -> Result<String, Error>;

    async fn upsert_setting(&self, key: &str, value: &str) -> Result<AppSetting, Error>;

    async fn list_settings(&self) -> Result<Vec<AppSetting>, Error>;
}

#[async_trait]
impl SettingsExt for DBClient {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, Error> {
        sqlx::query_scalar::<_, String>("SELECT value FROM app_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_i64_setting(&self, key: &str, default: i64) -> Result<i64, Error> {
        let value = self.get_setting(key).await?;
        Ok(value
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(default))
    }

    async fn get_setting_or(&self, key: &str, default: &str) -> Result<String, Error> {
        Ok(self
            .get_setting(key)
            .await?
            .unwrap_or_else(|| default.to_string()))
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> Result<AppSetting, Error> {
        sqlx::query_as::<_, AppSetting>(
            r#"
            INSERT INTO app_settings (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_settings(&self) -> Result<Vec<AppSetting>, Error> {
        sqlx::query_as::<_, AppSetting>("SELECT * FROM app_settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_keys() {
        assert!(is_recognized_key("bid_window_hours"));
        assert!(is_recognized_key("query_expiry_action"));
        assert!(!is_recognized_key("unknown_key"));
    }
}
