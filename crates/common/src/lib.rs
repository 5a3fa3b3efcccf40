//! Error plumbing shared by the gatehouse crates.
//!
//! Each crate keeps its own `Error` enum; implementing [`FromMessage`] and
//! invoking [`impl_context!`] gives it `.context()` / `.with_context()`.

pub mod context;

pub use context::FromMessage;
