//! Unit tests for the labeling workflow.

mod access_tests;
mod init_rollback_tests;
mod support;
