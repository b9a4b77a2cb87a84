//! Shared test utilities for murmur integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Time-dependent tests run with a paused tokio clock
//! (`#[tokio::test(start_paused = true)]`) and move it with
//! `tokio::time::advance`.

#![allow(dead_code, unused_imports)]

pub mod assertions;
pub mod builders;
pub mod fake_mailer;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fake_mailer::*;
pub use fixtures::*;
