pub mod auth;
pub mod catalog;
pub mod health;
pub mod requests;
pub mod service_requests;
