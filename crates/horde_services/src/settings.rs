//! Settings management

use horde_core::query::{SpatialHashConfig, SpatialHashConfigError, DEFAULT_CELL_SIZE};
use horde_core::time::{ClockConfig, ClockConfigError, DEFAULT_MAX_CATCH_UP_TICKS, TICK_RATE_HZ};
use horde_core::SimulationConfig;
use horde_metrics::{PerformanceMonitor, DEFAULT_SMOOTHING};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings JSON")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Clock(#[from] ClockConfigError),

    #[error(transparent)]
    Spatial(#[from] SpatialHashConfigError),

    #[error("particle pool capacity must be non-zero")]
    ZeroParticleCapacity,

    #[error("metrics smoothing must be in (0, 1], got {0}")]
    InvalidSmoothing(f64),
}

/// Simulation settings. Every field falls back to its default when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimulationSettings,
    pub spatial: SpatialSettings,
    pub particles: ParticleSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub tick_rate_hz: u32,
    /// Most ticks one host frame may run
    pub max_catch_up_ticks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialSettings {
    pub cell_size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub capacity: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub smoothing: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            max_catch_up_ticks: DEFAULT_MAX_CATCH_UP_TICKS,
        }
    }
}

impl Default for SpatialSettings {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            capacity: 1024,
            seed: 7,
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

impl Settings {
    /// Read and validate settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&text)?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Parse and validate settings from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.clock_config()?;
        self.spatial_config()?;
        if self.particles.capacity == 0 {
            return Err(SettingsError::ZeroParticleCapacity);
        }
        let smoothing = self.metrics.smoothing;
        if !(smoothing > 0.0 && smoothing <= 1.0) {
            return Err(SettingsError::InvalidSmoothing(smoothing));
        }
        Ok(())
    }

    pub fn clock_config(&self) -> Result<ClockConfig, ClockConfigError> {
        ClockConfig::from_tick_rate(
            self.simulation.tick_rate_hz,
            self.simulation.max_catch_up_ticks,
        )
    }

    pub fn spatial_config(&self) -> Result<SpatialHashConfig, SpatialHashConfigError> {
        SpatialHashConfig::new(self.spatial.cell_size)
    }

    /// Everything a `SimulationContext` needs, validated.
    pub fn simulation_config(&self) -> Result<SimulationConfig, SettingsError> {
        self.validate()?;
        Ok(SimulationConfig {
            clock: self.clock_config()?,
            spatial: self.spatial_config()?,
            particle_capacity: self.particles.capacity,
            particle_seed: self.particles.seed,
            ..SimulationConfig::default()
        })
    }

    pub fn performance_monitor(&self) -> PerformanceMonitor {
        if self.metrics.enabled {
            PerformanceMonitor::new(self.metrics.smoothing)
        } else {
            PerformanceMonitor::disabled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_shape() {
        let json = r#"{
            "simulation": { "tick_rate_hz": 60, "max_catch_up_ticks": 4 },
            "spatial":    { "cell_size": 120.0 },
            "particles":  { "capacity": 1024, "seed": 7 },
            "metrics":    { "enabled": true, "smoothing": 0.1 }
        }"#;
        assert_eq!(Settings::from_json_str(json).unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let settings = Settings::from_json_str(r#"{ "particles": { "capacity": 64 } }"#).unwrap();
        assert_eq!(settings.particles.capacity, 64);
        assert_eq!(settings.particles.seed, 7);
        assert_eq!(settings.simulation, SimulationSettings::default());

        assert_eq!(Settings::from_json_str("{}").unwrap(), Settings::default());
    }

    #[test]
    fn test_simulation_config_conversion() {
        let mut settings = Settings::default();
        settings.simulation.tick_rate_hz = 50;
        settings.simulation.max_catch_up_ticks = 3;
        settings.spatial.cell_size = 64.0;

        let config = settings.simulation_config().unwrap();
        assert_eq!(config.clock.fixed_dt_ms(), 20.0);
        assert_eq!(config.clock.max_accumulator_ms(), 60.0);
        assert_eq!(config.clock.max_ticks_per_frame(), 3);
        assert_eq!(config.spatial.cell_size(), 64.0);
        assert_eq!(config.particle_capacity, 1024);
        assert_eq!(config.particle_seed, 7);
    }

    #[test]
    fn test_validation_errors() {
        let zero_rate = r#"{ "simulation": { "tick_rate_hz": 0 } }"#;
        assert!(matches!(
            Settings::from_json_str(zero_rate),
            Err(SettingsError::Clock(ClockConfigError::ZeroTickRate))
        ));

        let bad_cell = r#"{ "spatial": { "cell_size": -5.0 } }"#;
        assert!(matches!(
            Settings::from_json_str(bad_cell),
            Err(SettingsError::Spatial(_))
        ));

        let empty_pool = r#"{ "particles": { "capacity": 0 } }"#;
        assert!(matches!(
            Settings::from_json_str(empty_pool),
            Err(SettingsError::ZeroParticleCapacity)
        ));

        let smoothing = r#"{ "metrics": { "smoothing": 1.5 } }"#;
        assert!(matches!(
            Settings::from_json_str(smoothing),
            Err(SettingsError::InvalidSmoothing(s)) if s == 1.5
        ));

        assert!(matches!(
            Settings::from_json_str("{ not json"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("horde-settings-{}.json", std::process::id()));
        let mut settings = Settings::default();
        settings.particles.seed = 99;
        std::fs::write(&path, settings.to_json_pretty().unwrap()).unwrap();

        let loaded = Settings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("horde-settings-does-not-exist.json");
        match Settings::load(&path) {
            Err(SettingsError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn test_performance_monitor_respects_enabled() {
        let mut settings = Settings::default();
        settings.metrics.enabled = false;
        assert!(!settings.performance_monitor().is_enabled());
    }
}
