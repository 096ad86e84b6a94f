pub mod job_monitor;
pub mod operations;
pub mod provision_service;
pub mod resolver;
