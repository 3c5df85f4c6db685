//! Tool execution harness for Watchtower.
//!
//! - [`adapters`]: the static table mapping a tool name to its command line
//!   and auth-injection style
//! - [`executor`]: runs one external command under a hard timeout and never
//!   fails (errors become output text)
//! - [`truncate`]: the keyword-first / head-tail output truncation policy
//! - [`runner`]: [`AdapterRunner`], the production `ToolRunner`
//! - [`detect`]: finds which adapters have an executable on `PATH`

pub mod adapters;
pub mod detect;
pub mod executor;
pub mod runner;
pub mod truncate;

pub use adapters::{AdapterRegistry, AuthStyle, ToolAdapter};
pub use detect::{installed_tools, is_installed};
pub use executor::ProcessExecutor;
pub use runner::AdapterRunner;
pub use truncate::truncate_output;

/// Create the production runner: every built-in adapter, given timeout.
pub fn default_runner(timeout_secs: u64) -> AdapterRunner {
    AdapterRunner::new(AdapterRegistry::builtin(), ProcessExecutor::new(timeout_secs))
}
