//! HTTP API handlers for ctrk-api

pub mod components;
pub mod export;
pub mod health;
pub mod sse;
pub mod upload;

pub use components::component_routes;
pub use export::export_routes;
pub use health::health_routes;
pub use sse::event_stream;
pub use upload::upload_routes;
