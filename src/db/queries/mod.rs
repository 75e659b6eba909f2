pub mod requests;
pub mod service;
pub mod user;
