//! Command handlers.

pub mod history;
pub mod relay;
