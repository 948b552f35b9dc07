//! Core engine: pair selection, the per-cycle trader, order execution,
//! gain accounting, and the main loop.

pub mod accountant;
pub mod executor;
pub mod runner;
pub mod selector;
pub mod sleeper;
pub mod trader;
