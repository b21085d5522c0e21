//! Tracing/logging setup shared by every binary.
//!
//! Library crates only emit `tracing` events; installing the subscriber is the
//! binary's job, through [`init`].

pub mod tracing;

pub use self::tracing::{LogConfig, LogFormat, ParseLogFormatError, init};
