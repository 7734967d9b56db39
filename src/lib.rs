//! # Task Planner
//!
//! A personal task list with email reminders, persisted as flat JSON files.
//!
//! This library provides:
//! - A task store (add / list / complete / delete) with case-insensitive unique
//!   names and ids that are never reused
//! - A subscription store that walks each email through
//!   pending -> verified -> unsubscribed using mailed verification codes
//! - A reminder dispatcher that mails the open tasks to every verified subscriber
//!
//! ## Storage
//!
//! Every store is a whole JSON document rewritten on each mutation. Writers
//! hold an exclusive file lock for the full read-modify-write cycle and replace
//! the document atomically, so concurrent processes never lose updates or
//! observe a half-written file. Reads never fail: missing or corrupt documents
//! read as empty state.
//!
//! ## Modules
//! - `task_store`: tasks and their file / in-memory backends
//! - `subscription_store`: pending and verified subscribers
//! - `mail`: message templates and transports
//! - `reminder`: the periodic reminder broadcast
//! - `planner`: facade used by the CLI

pub mod clock;
pub mod config;
pub mod json_file;
pub mod mail;
pub mod planner;
pub mod reminder;
pub mod subscription_store;
pub mod task_store;
pub mod util;

pub use config::Config;
pub use planner::{PlannerError, TaskPlanner};
pub use reminder::ReminderDispatcher;
pub use subscription_store::{SubscriptionError, SubscriptionStore};
pub use task_store::{Task, TaskId, TaskStore, TaskStoreError};
