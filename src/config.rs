use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::bencode::{DecodeMode, DecodeOptions, DEFAULT_MAX_DEPTH};

pub const DEFAULT_CONFIG_PATH: &str = "rusbit.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: DecodeMode,
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: DecodeMode::Strict,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    /// Loads the config at `path`, or the defaults if the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let path = path.as_ref();
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::new(self.mode).with_max_depth(self.max_depth)
    }
}
