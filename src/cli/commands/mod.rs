//! CLI command implementations.

mod analyze;
mod clear;
mod config;
mod list;
mod status;

pub use analyze::run_analyze;
pub use clear::run_clear;
pub use config::run_config;
pub use list::run_list;
pub use status::run_status;
