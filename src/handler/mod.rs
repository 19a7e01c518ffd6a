pub mod admin;
pub mod agencies;
pub mod auth;
pub mod jobs;
pub mod notifications;
pub mod requests;
pub mod timesheets;
pub mod users;
