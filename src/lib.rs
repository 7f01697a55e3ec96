//! Core engine for fleet turnstile-reading reconciliation.
//!
//! One operation day at a time, the tracker merges the active-vehicle roster
//! with the day's submitted readings into a pending/done view, filters and
//! paginates that view, accepts submissions while offline through a durable
//! local queue, and replays the queue in order when connectivity returns.
//!
//! The crate is UI-free and backend-free: rendering, authentication and the
//! real document database live in the embedder. [`store::DocumentStore`] and
//! [`storage::LocalStore`] are the two seams; [`workflow::OperatorWorkflow`]
//! is the operator-facing entry point, with [`services`] covering the
//! registry, reports and admin surfaces.

pub mod config;
pub mod connectivity;
pub mod constants;
pub mod error;
pub mod filters;
pub mod models;
pub mod offline;
pub mod reconcile;
pub mod services;
pub mod storage;
pub mod store;
pub mod utils;
pub mod workflow;

pub use config::AppConfig;
pub use connectivity::{Connectivity, ConnectivityMonitor, Transition};
pub use error::{Result, TrackerError};
pub use filters::{ListAction, ListState, Page};
pub use models::{
    ChannelReading, MergedItem, Operator, OperatorRole, RecordForm, TurnstileRecord,
};
pub use offline::OfflineQueue;
pub use reconcile::{DayView, Progress, ReconciliationEngine};
pub use services::{AdminService, FleetService, ReportService};
pub use storage::{JsonFileStore, LocalStore, MemoryLocalStore};
pub use store::{DocumentStore, MemoryStore};
pub use workflow::{OperatorWorkflow, SubmissionOutcome};
