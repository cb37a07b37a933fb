//! Test doubles for the pipeline seams
//!
//! Used by this crate's own tests and available to downstream integration tests.

mod mocks;

pub use mocks::{RecordingSink, ScriptedClient, StaticFetcher};
