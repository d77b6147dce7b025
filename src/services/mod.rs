pub mod duplicate_guard;
pub mod email_sender;
pub mod email_templates;
pub mod file_store;
pub mod import_processor;
pub mod job_tracker;
pub mod roster_store;
pub mod row_parser;
pub mod row_validator;
