//! HTTP handlers

pub mod status;
pub mod webhook;

pub use status::{root, status};
pub use webhook::handle_webhook;
