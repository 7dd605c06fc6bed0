//! Database access for ctrk-api

pub mod components;
pub mod upload_log;

pub use components::{ComponentFilter, StoredComponent};
