//! # Plan Lifecycle Events
//!
//! Best-effort notifications about plan and work item progress. Event names
//! live in [`crate::constants::events`].

pub mod publisher;

pub use publisher::{EventPublisher, EventPublisherStats, PublishError, PublishedEvent};
