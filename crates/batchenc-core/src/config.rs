use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Global configuration loaded from `~/.config/batchenc/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchencConfig {
    /// Encoder executable (looked up on PATH unless absolute).
    pub encoder_program: String,
    /// Extension of eligible source files, matched case-insensitively.
    pub input_extension: String,
    /// Extension of the output container.
    pub output_extension: String,
    /// Audio codec passed to the encoder (`-c:a`).
    pub audio_codec: String,
    /// Flag that precedes the quality value (e.g. `-b:a` or `-q:a`).
    pub quality_flag: String,
    /// Quality used when the caller does not supply one. Forwarded verbatim.
    pub default_quality: String,
    /// Maximum concurrent encoder processes (None = detected processor count).
    #[serde(default)]
    pub max_parallel: Option<usize>,
    /// Per-file encoder timeout in seconds (None = wait indefinitely).
    #[serde(default)]
    pub encode_timeout_secs: Option<u64>,
    /// Prefix outputs with their two-digit scan ordinal ("01 - name").
    #[serde(default)]
    pub sequential_naming: bool,
}

impl Default for BatchencConfig {
    fn default() -> Self {
        Self {
            encoder_program: "ffmpeg".to_string(),
            input_extension: "flac".to_string(),
            output_extension: "m4a".to_string(),
            audio_codec: "aac".to_string(),
            quality_flag: "-b:a".to_string(),
            default_quality: "256k".to_string(),
            max_parallel: None,
            encode_timeout_secs: None,
            sequential_naming: false,
        }
    }
}

impl BatchencConfig {
    /// Number of encoder processes allowed to run at once: the configured
    /// override, else the detected processor count. Never less than 1.
    pub fn effective_parallelism(&self) -> usize {
        self.max_parallel
            .unwrap_or_else(detected_parallelism)
            .max(1)
    }

    pub fn encode_timeout(&self) -> Option<Duration> {
        self.encode_timeout_secs.map(Duration::from_secs)
    }

    /// Pretty TOML, as written to the config file.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Processor count as reported by the OS, or 1 if it cannot be determined.
pub fn detected_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("batchenc")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BatchencConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BatchencConfig::default();
        let toml = default_cfg.to_toml_string()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BatchencConfig = toml::from_str(&data)?;
    Ok(cfg)
}
