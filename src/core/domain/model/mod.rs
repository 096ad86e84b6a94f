pub mod config;
pub mod connection;
pub mod job;
pub mod resource;
pub mod vm_spec;
