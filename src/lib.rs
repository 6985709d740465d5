#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasker Plan
//!
//! Concurrent, dependency-ordered execution of build work.
//!
//! ## Overview
//!
//! A build requests work in ordinal groups. Each work item may depend on
//! others, either hard ("needs it to succeed") or by ordering only ("must run
//! after it"). The [`ExecutionPlan`](plan::ExecutionPlan) tracks the state of
//! every item and hands ready items to worker threads through the
//! [`WorkSource`](plan::WorkSource) contract, while a
//! [`PlanExecutor`](execution::PlanExecutor) runs those workers.
//!
//! ## Module Organization
//!
//! - [`plan`] - Work graph, scheduling and the `WorkSource` contract
//! - [`execution`] - Worker threads, permits and metrics
//! - [`state_machine`] - Work item states and legal transitions
//! - [`diagnostics`] - Health snapshots for stuck plans
//! - [`events`] - Progress event publishing
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust
//! use tasker_plan::execution::PlanExecutor;
//! use tasker_plan::plan::{ExecutionPlanBuilder, WorkItem};
//!
//! # fn main() -> tasker_plan::Result<()> {
//! let mut builder = ExecutionPlanBuilder::new("build");
//! let group = builder.ordinal_group();
//! let compile = builder.add_item(group, ":compileJava", "javac");
//! let test = builder.add_item(group, ":test", "junit");
//! builder.add_dependency(test, compile);
//! let plan = builder.build()?;
//!
//! let action = |item: &WorkItem<&str>| -> anyhow::Result<()> {
//!     println!("running {} with {}", item.name(), item.payload());
//!     Ok(())
//! };
//! let summary = PlanExecutor::default().run(&plan, &action)?;
//! assert!(summary.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Unit tests live next to the code; scenario, executor and property-based
//! tests are under `tests/`.

pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod execution;
pub mod logging;
pub mod plan;
pub mod state_machine;

pub use config::{ConfigManager, FailurePolicy, PlanConfig};
pub use error::{PlanError, Result};
pub use execution::{ExecutionSummary, ItemAction, PlanExecutor};
pub use plan::{
    ExecutionPlan, ExecutionPlanBuilder, ExecutionState, PlanFailure, Selection, WorkItem,
    WorkItemId, WorkSource,
};
