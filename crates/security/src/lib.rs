//! Security gates for Watchtower.
//!
//! Provides:
//! - **Target validation**: a purely syntactic check run once before a run starts
//! - **Redaction**: scrubbing auth metadata values out of log lines

pub mod redact;
pub mod target;

pub use redact::{REDACTED, redact_command};
pub use target::{check_target, validate_target};
