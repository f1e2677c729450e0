//! Labelflow: a human-annotation workflow engine.
//!
//! This crate assigns image-labeling and review work across teams, tracks
//! per-image progress through a multi-role pipeline, and rolls that progress
//! up into task and project status.
//!
//! # Architecture
//!
//! Labelflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure workflow rules with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage and directories
//! - **Adapters**: Concrete implementations of ports (in-memory today)
//! - **Services**: Orchestration that serializes work per task and project
//!
//! # Modules
//!
//! - [`labeling`]: Projects, tasks, roles and the label/review state machine
//! - [`config`]: Environment-driven process settings
//! - [`telemetry`]: Tracing subscriber installation

pub mod config;
pub mod labeling;
pub mod telemetry;
