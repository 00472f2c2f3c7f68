//! Notification use-cases.
//!
//! # Responsibility
//! - Derive denormalized fields at creation time (`origin`).
//! - Repair cached batches (`rehydrate`).
//! - Orchestrate repositories into create/list/clear APIs.

pub mod notification_service;
pub mod origin;
pub mod rehydrate;
