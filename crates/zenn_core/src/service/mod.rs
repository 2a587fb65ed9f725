//! Use-case services around the task cache.
//!
//! # Responsibility
//! - Orchestrate store calls, cache updates and user notifications.
//! - Keep presentation code away from store and rollback details.

pub mod auth;
pub mod mutation;
pub mod notify;
mod queue;
