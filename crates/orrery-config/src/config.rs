//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub viewport: ViewportConfig,
    /// Day/night clock.
    pub clock: ClockConfig,
    /// World dimensions the parallax and arc maths are measured against.
    pub world: WorldConfig,
    /// Headless frame loop.
    pub simulation: SimulationConfig,
    pub debug: DebugConfig,
}

/// Size of the screen the sky is drawn onto.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClockConfig {
    /// Length of the day half in ticks.
    pub day_length: f64,
    /// Length of the night half in ticks.
    pub night_length: f64,
    /// Ticks already elapsed in the starting half.
    pub start_time: f64,
    pub start_in_day: bool,
    /// Ticks the clock advances per simulated frame.
    pub ticks_per_frame: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// World width in pixels.
    pub width: f32,
    /// Height of the surface layer in pixels.
    pub surface_height: f32,
    /// Viewer position at startup. The world center when unset.
    pub player_start: Option<(f32, f32)>,
    /// Horizontal distance the viewer walks per frame.
    pub player_speed: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of frames to run.
    pub frames: u32,
    /// Cloud cover in `[0, 1]`; fades bodies on the day/night arc.
    pub cloud_alpha: f32,
    /// Log a frame summary every this many frames. `0` disables summaries.
    pub report_interval: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level filter (e.g. "debug", "info", "warn,orrery_sky=debug").
    pub log_level: String,
    /// Log every recorded batch command at trace level.
    pub trace_batch: bool,
}

// --- Default implementations ---

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            day_length: 54_000.0,
            night_length: 32_400.0,
            start_time: 0.0,
            start_in_day: true,
            ticks_per_frame: 60.0,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 67_200.0,
            surface_height: 7_200.0,
            player_start: None,
            player_speed: 4.0,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            cloud_alpha: 0.0,
            report_interval: 60,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            trace_batch: false,
        }
    }
}

/// Platform config directory for orrery, e.g. `~/.config/orrery` on Linux.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("orrery"))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::WriteError)
    }

    /// Re-read `config.ron`: `Some(new_config)` if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = std::fs::read_to_string(config_dir.join(CONFIG_FILE))
            .map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
