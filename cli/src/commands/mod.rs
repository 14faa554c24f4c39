pub mod batch;
pub mod config;
pub mod pull;

use clap::ValueEnum;

/// How transfers are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Bounded-concurrency downloads
    Concurrent,
    /// One at a time, in input order
    Sequential,
}
