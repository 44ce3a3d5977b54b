use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SplitError};

/// Settings shared by every run in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SplitterConfig {
    /// Fixed percussion channel, 0-based (GM channel 10 is 9)
    pub drum_channel: u8,
    /// Highest usable channel, 0-based
    pub max_channel: u8,
    /// Replaces `[` in marker and cue point text
    pub loop_start_token: String,
    /// Replaces `]` in marker and cue point text
    pub loop_end_token: String,
    /// Appended to the input file stem for the output file name
    pub output_suffix: String,
    /// Events between progress lines; 0 disables them
    pub progress_interval: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            drum_channel: 9,
            max_channel: 15,
            loop_start_token: "loopStart".to_string(),
            loop_end_token: "loopEnd".to_string(),
            output_suffix: "_split_remapped".to_string(),
            progress_interval: 1000,
        }
    }
}

impl SplitterConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SplitError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_channel > 15 {
            return Err(SplitError::Config(format!(
                "max channel {} is above 15",
                self.max_channel
            )));
        }
        if self.drum_channel > self.max_channel {
            return Err(SplitError::Config(format!(
                "drum channel {} is above max channel {}",
                self.drum_channel, self.max_channel
            )));
        }
        if self.output_suffix.contains(['/', '\\']) {
            return Err(SplitError::Config(format!(
                "output suffix '{}' contains a path separator",
                self.output_suffix
            )));
        }
        Ok(())
    }

    pub fn is_drum_channel(&self, channel: u8) -> bool {
        channel == self.drum_channel
    }
}
