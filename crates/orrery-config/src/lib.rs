//! Configuration for orrery hosts.
//!
//! Settings persist to disk as `config.ron` and can be overridden from the
//! command line. Unknown or missing fields fall back to defaults so old files
//! keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    ClockConfig, Config, DebugConfig, SimulationConfig, ViewportConfig, WorldConfig,
    default_config_dir,
};
pub use error::ConfigError;
