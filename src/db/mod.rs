pub mod caredb;
pub mod db;
pub mod settingsdb;
pub mod userdb;
