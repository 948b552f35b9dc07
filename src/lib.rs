//! PAIRBOT — adaptive single-pair crypto trading loop
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod cli;
pub mod config;
pub mod engine;
pub mod exchange;
pub mod indicators;
pub mod logging;
pub mod storage;
pub mod strategy;
pub mod types;
