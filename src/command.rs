//! # Command descriptors: the serialization contract between processes.
//!
//! Every node of a survey — surface, goal, reporter, intermediate binding —
//! knows how to render itself as an ordered list of string tokens. The
//! scheduler concatenates the tokens of all nodes into one worker invocation;
//! the worker entry point parses them back (via
//! [`Registry`](crate::registry::Registry)) and reconstructs an equivalent
//! graph. This round trip is the *only* channel between scheduler and worker,
//! so it must be exact.
//!
//! ## Rules
//! - Options are rendered only when they differ from the node's default, so
//!   commands stay short and stable.
//! - A descriptor is produced on demand from live node state; it is never
//!   persisted as a first-class object.

/// Renders a node as the command tokens that reconstruct it.
pub trait Command {
    /// Returns the tokens that recreate this node with its current
    /// configuration, starting with the node's name.
    fn command(&self) -> Vec<String>;
}

/// Joins command tokens into a display string, for logs.
pub fn render(tokens: &[String]) -> String {
    tokens.join(" ")
}
