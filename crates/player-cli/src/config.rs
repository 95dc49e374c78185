//! Optional TOML configuration.
//!
//! ```toml
//! device = "USB DAC"
//! chunk_frames = 2048
//! max_decoded_mib = 1024
//!
//! [sources]
//! intro = "/music/intro.flac"
//! theme = "file:///music/theme.ogg"
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use audio_engine::EngineConfig;
use focus_player::SourceRef;
use serde::Deserialize;

/// Top-level player configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct PlayerConfig {
    /// Output device substring.
    pub device: Option<String>,
    /// Resampler input chunk size in frames.
    pub chunk_frames: Option<usize>,
    /// Ceiling on the decoded track kept in memory, in MiB.
    pub max_decoded_mib: Option<usize>,
    /// Named sources: name -> path or URI.
    pub sources: Option<HashMap<String, String>>,
}

impl PlayerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        toml::from_str::<PlayerConfig>(&raw).with_context(|| format!("parse config {:?}", path))
    }

    /// Map a configured source name to its reference; anything else is taken literally.
    pub fn resolve_source(&self, name: &str) -> SourceRef {
        self.sources
            .as_ref()
            .and_then(|s| s.get(name))
            .map(|target| SourceRef::new(target.as_str()))
            .unwrap_or_else(|| SourceRef::new(name))
    }

    /// Engine config with command-line values taking precedence over the file.
    pub fn engine_config(&self, device: Option<String>, chunk_frames: Option<usize>) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            device: device.or_else(|| self.device.clone()),
            chunk_frames: chunk_frames
                .or(self.chunk_frames)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.chunk_frames),
            max_decoded_mib: self
                .max_decoded_mib
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_decoded_mib),
        }
    }
}
