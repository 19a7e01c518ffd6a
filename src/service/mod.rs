pub mod agreement;
pub mod background_jobs;
pub mod bid_service;
pub mod contract_service;
pub mod error;
pub mod job_service;
pub mod notification_service;
pub mod rating_registry;
pub mod timesheet_service;
