//! deskmate — a natural-language front end for tasks, calendar and mail.
//!
//! Utterances are split into directives, classified, and routed to
//! handlers that talk to Google Tasks, Google Calendar and Gmail.
//! Deferred sends go through a background scheduler task.

pub mod cache;
pub mod config;
pub mod error;
pub mod processor;
pub mod scheduler;
pub mod services;

pub use config::{AssistantConfig, Capability};
pub use error::{AssistantError, Result};
pub use processor::Assistant;
