//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! worker_threads = 0          # 0 = one per core, minus the main thread
//! asset_root = "assets"
//! fixed_timestep = 0.016666668
//! max_steps_per_frame = 5
//! vsync = true
//! window_size = [1280, 720]
//!
//! [render]
//! shadows = true
//! force_all_visible = false
//! ```

use std::path::{Path, PathBuf};
use std::thread;

use ember_rendering::RenderConfig;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Resource worker threads. 0 picks one per core minus one.
    pub worker_threads: usize,
    /// Directory assets are read from.
    pub asset_root: PathBuf,
    /// Simulation step in seconds.
    pub fixed_timestep: f32,
    /// Cap on simulation steps per tick; the rest of the backlog is dropped.
    pub max_steps_per_frame: u32,
    /// Present with vsync.
    pub vsync: bool,
    /// Initial window size in pixels.
    pub window_size: [u32; 2],
    /// Draw physics debug geometry.
    pub debug_physics: bool,
    /// Pass selection for the renderer.
    pub render: RenderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            asset_root: PathBuf::from("assets"),
            fixed_timestep: 1.0 / 60.0,
            max_steps_per_frame: 5,
            vsync: true,
            window_size: [1280, 720],
            debug_physics: false,
            render: RenderConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] on malformed TOML, unknown keys or
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] naming the first bad field.
    pub fn validate(&self) -> EngineResult<()> {
        if !self.fixed_timestep.is_finite() || self.fixed_timestep <= 0.0 {
            return Err(EngineError::Config(format!(
                "fixed_timestep must be a positive number of seconds, got {}",
                self.fixed_timestep
            )));
        }
        if self.max_steps_per_frame == 0 {
            return Err(EngineError::Config(
                "max_steps_per_frame must be at least 1".into(),
            ));
        }
        if self.window_size.contains(&0) {
            return Err(EngineError::Config(format!(
                "window_size must be non-zero, got {:?}",
                self.window_size
            )));
        }
        Ok(())
    }

    /// Worker count with `0` resolved against the machine.
    #[must_use]
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        thread::available_parallelism()
            .map_or(1, |n| n.get().saturating_sub(1))
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = EngineConfig::from_toml_str(
            "worker_threads = 3\nvsync = false\n[render]\nshadows = false\n",
        )
        .unwrap();
        assert_eq!(config.worker_threads, 3);
        assert!(!config.vsync);
        assert!(!config.render.shadows);
        assert!(config.render.use_3d);
        assert_eq!(config.max_steps_per_frame, 5);
    }

    #[test]
    fn test_rejects_bad_values() {
        for text in [
            "fixed_timestep = 0.0",
            "fixed_timestep = -1.0",
            "max_steps_per_frame = 0",
            "window_size = [0, 720]",
        ] {
            assert!(
                matches!(EngineConfig::from_toml_str(text), Err(EngineError::Config(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn test_rejects_malformed_toml_and_unknown_keys() {
        assert!(matches!(
            EngineConfig::from_toml_str("vsync = "),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("frame_rate = 60"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_worker_threads_resolution() {
        let config = EngineConfig {
            worker_threads: 6,
            ..EngineConfig::default()
        };
        assert_eq!(config.resolved_worker_threads(), 6);
        assert!(EngineConfig::default().resolved_worker_threads() >= 1);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("ember-config-{}.toml", std::process::id()));
        std::fs::write(&path, "max_steps_per_frame = 2\n").unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.max_steps_per_frame, 2);

        assert!(matches!(
            EngineConfig::from_file(&path),
            Err(EngineError::Io(_))
        ));
    }
}
