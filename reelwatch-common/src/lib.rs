//! Shared plumbing for the reelwatch crates.
//!
//! Right now this is only the [`observability`] module: every binary and
//! integration test initialises `tracing` through it so that log output looks
//! the same no matter which crate emitted the event.
pub mod observability;
