pub mod application;
pub mod application_log;
pub mod data_manager;
pub mod delegation;
pub mod table_filter;
pub mod user;
