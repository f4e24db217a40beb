//! Scan-scoped channel management
//!
//! One background scan, one socket. The controller owns the scoped client,
//! rebinds it when the watched job changes, and surfaces the completion
//! notification to its owning context.

pub mod controller;

pub use controller::{CompletionWatcher, ScanAffinityController, ScanOutcome};
