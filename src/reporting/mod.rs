//! # Reporting: how verdicts and progress leave a worker.
//!
//! Goals never print or write files themselves; they hand events to a
//! [`Report`] dispatcher, which fans each event out to the attached
//! [`Reporter`]s in attachment order.
//!
//! ```text
//!            ┌─────────────┐        ┌──► LogReporter  (tracing lines)
//!  goals ──► │   Report    │ ───────┤
//!            │ (dispatch)  │        └──► JsonReporter (result file)
//!            └─────────────┘
//! ```
//!
//! ## Rules
//! - Reporters receive events in attachment order; that order is part of
//!   the pipeline's deterministic contract.
//! - A source can be muted on the dispatcher; muted events reach no
//!   reporter at all.
//! - `flush` runs exactly once, at the very end of a worker run.

mod json;
mod log;
mod report;
mod reporter;

pub use self::log::LogReporter;
pub use json::JsonReporter;
pub use report::Report;
pub use reporter::{Fields, Reporter};
