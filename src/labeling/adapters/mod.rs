//! Persistence and directory adapters for the labeling workflow.
//!
//! Adapters implement the [`ports`](crate::labeling::ports) contracts. Only
//! thread-safe in-memory implementations ship with the crate; storage engines
//! plug in behind the same traits.

pub mod memory;
