//! HTTP layer (driver adapter).

pub mod controller;
pub mod request;
pub mod response;

pub use controller::{AppState, create_router};
