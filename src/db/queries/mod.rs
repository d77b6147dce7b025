//! Database queries

pub mod employee;
pub mod import_job;
pub mod user;
