//! Step definitions for review verdict scenarios.

mod given;
mod then;
mod when;
pub mod world;
