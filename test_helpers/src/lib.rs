//! Test helpers shared across the konfig workspace.
//!
//! Currently this is a set of guards for tests that observe or mutate the
//! process environment.

pub mod env;
