use std::sync::Arc;
use std::time::Duration;

use crate::service::timesheet_service::TimesheetService;

const QUERY_EXPIRY_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Hourly sweep over timesheets whose query response window has lapsed.
/// What the sweep does with them is driven by the query_expiry_action
/// setting, read on every pass so an admin change takes effect without a
/// restart.
pub fn start_query_expiry_job(timesheet_service: Arc<TimesheetService>) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(QUERY_EXPIRY_SWEEP_INTERVAL_SECS));

        loop {
            interval.tick().await;

            match timesheet_service.expire_overdue_queries().await {
                Ok(0) => {}
                Ok(settled) => {
                    tracing::info!("Query expiry sweep settled {} timesheet(s)", settled);
                }
                Err(e) => {
                    tracing::error!("Query expiry sweep failed: {}", e);
                }
            }
        }
    });
}
