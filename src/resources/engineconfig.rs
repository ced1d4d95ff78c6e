//! Runtime configuration resource.
//!
//! Loaded from an INI file with safe defaults for anything missing.
//!
//! # Configuration File Format
//!
//! ```ini
//! [runtime]
//! tick_rate = 60
//! max_steps_per_resume = 256
//! diagnostics_capacity = 128
//!
//! [content]
//! path = ./content.json
//!
//! [log]
//! level = info
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::resources::interpreter::{
    DEFAULT_DIAGNOSTICS_CAPACITY, DEFAULT_MAX_STEPS_PER_RESUME, InterpreterSettings,
};

/// Default safe values for startup
const DEFAULT_TICK_RATE: u32 = 60;
const DEFAULT_CONTENT_PATH: &str = "./content.json";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Simulation ticks per second; the fixed delta is `1 / tick_rate`.
    pub tick_rate: u32,
    /// Steps one task may run per resume before yielding.
    pub max_steps_per_resume: usize,
    /// Number of step diagnostics kept.
    pub diagnostics_capacity: usize,
    /// Content file to load.
    pub content_path: PathBuf,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_steps_per_resume: DEFAULT_MAX_STEPS_PER_RESUME,
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
            content_path: PathBuf::from(DEFAULT_CONTENT_PATH),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    /// Load configuration from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [runtime] section
        if let Some(rate) = config.getuint("runtime", "tick_rate").ok().flatten() {
            if rate > 0 {
                self.tick_rate = rate as u32;
            }
        }
        if let Some(steps) = config
            .getuint("runtime", "max_steps_per_resume")
            .ok()
            .flatten()
        {
            if steps > 0 {
                self.max_steps_per_resume = steps as usize;
            }
        }
        if let Some(cap) = config
            .getuint("runtime", "diagnostics_capacity")
            .ok()
            .flatten()
        {
            self.diagnostics_capacity = cap as usize;
        }

        // [content] section
        if let Some(path) = config.get("content", "path") {
            self.content_path = PathBuf::from(path);
        }

        // [log] section
        if let Some(level) = config.get("log", "level") {
            self.log_level = level;
        }

        info!(
            "Loaded config: tick_rate={}, max_steps_per_resume={}, diagnostics={}, content={:?}",
            self.tick_rate, self.max_steps_per_resume, self.diagnostics_capacity, self.content_path
        );
    }

    /// Save configuration to the INI file.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        config.set("runtime", "tick_rate", Some(self.tick_rate.to_string()));
        config.set(
            "runtime",
            "max_steps_per_resume",
            Some(self.max_steps_per_resume.to_string()),
        );
        config.set(
            "runtime",
            "diagnostics_capacity",
            Some(self.diagnostics_capacity.to_string()),
        );
        config.set(
            "content",
            "path",
            Some(self.content_path.to_string_lossy().into_owned()),
        );
        config.set("log", "level", Some(self.log_level.clone()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// Fixed simulation delta in seconds.
    pub fn tick_delta(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn interpreter_settings(&self) -> InterpreterSettings {
        InterpreterSettings {
            max_steps_per_resume: self.max_steps_per_resume,
            diagnostics_capacity: self.diagnostics_capacity,
        }
    }
}
