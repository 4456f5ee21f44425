//! Self-updating deployment agent.
//!
//! Each invocation compares the last applied commit (a marker file in the
//! working tree) with the head of a remote branch. When they differ the agent
//! fetches and checks out the new tree, records the new commit, runs the
//! build command and then launches the application. When they match, or the
//! remote cannot be reached, it only launches the application.
//!
//! See [`core::agent::Agent`] for the sequence itself.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod exec;
pub mod git;
pub mod logging;
