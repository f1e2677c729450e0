//! Labeling workflow for Labelflow.
//!
//! A project covers one or more datasets and is split into tasks at
//! initialization. Each task is staffed with a label leader, a review
//! leader, and a fixed number of labelers and reviewers. Every image of a
//! task carries a per-role status that is aggregated into role progress,
//! then into task status, then into project status. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
