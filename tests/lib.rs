//! Shared harness for the workspace integration and end-to-end tests

pub mod common;
