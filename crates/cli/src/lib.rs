//! batchwatch CLI library
//!
//! Configuration file handling and shell execution shared by the `bw`
//! binary and its tests.

pub mod config;
pub mod shell;
