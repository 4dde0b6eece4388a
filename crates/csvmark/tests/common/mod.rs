//! Shared test utilities for csvmark integration tests.
//!
//! `TestHarness` wires a registry, an on-disk artifact store and a dispatcher
//! inside a temporary directory.

pub mod harness;

pub use harness::TestHarness;
