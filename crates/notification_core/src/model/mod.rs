//! Domain model for notification records and the activities they point at.
//!
//! # Responsibility
//! - Define the notification aggregate and its polymorphic activity reference.
//! - Keep classification, targeting and browsability as pure functions.
//!
//! # Invariants
//! - An activity reference always carries one of the five closed kinds.
//! - `from_account_id` is derived once at creation and never re-derived.

pub mod account;
pub mod activity;
pub mod notification;
