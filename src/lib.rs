//! Declare test groups, run them in-process, natively or inside a sandbox,
//! and bring one structured report back to the invoking process.

pub mod assert;
pub mod cli;
pub mod collector;
pub mod config;
pub mod engine;
pub mod harness;
pub mod models;
pub mod printer;
pub mod registry;
pub mod runner;

pub use engine::{AbortHandle, Engine};
pub use models::{GroupReport, RunReport, TestOutcome, TestStatus};
pub use registry::{GroupBuilder, Registry, Selection};
