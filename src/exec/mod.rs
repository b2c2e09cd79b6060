// src/exec/mod.rs

//! Run execution layer.
//!
//! - [`backend`] provides the `RunBackend` trait and the `RealRunBackend`
//!   that the runtime uses in production; tests replace it with a fake.
//! - [`task_runner`] executes one scheduled run through the [`Runner`]
//!   and reports its outcome back to the runtime.
//!
//! [`Runner`]: crate::runner::Runner

pub mod backend;
pub mod task_runner;

pub use backend::{RealRunBackend, RunBackend};
pub use task_runner::run_scheduled;
