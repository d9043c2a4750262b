use serde::Deserialize;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `SURVEY__`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub sequencer: SequencerConfig,
    #[serde(default)]
    pub countdown: CountdownConfig,
    #[serde(default)]
    pub drafts: DraftConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SequencerConfig {
    /// How long the thank-you card stays up before the completion signal fires.
    #[serde(default = "default_thank_you_delay_ms")]
    pub thank_you_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountdownConfig {
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftConfig {
    /// 0 keeps drafts until the survey finishes.
    #[serde(default)]
    pub ttl_secs: u64,
    #[serde(default = "default_max_surveys")]
    pub max_surveys: usize,
}

fn default_thank_you_delay_ms() -> u64 {
    2000
}
fn default_frame_interval_ms() -> u64 {
    16
}
fn default_max_surveys() -> usize {
    10_000
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            thank_you_delay_ms: default_thank_you_delay_ms(),
        }
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 0,
            max_surveys: default_max_surveys(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering the environment over an optional TOML file.
    pub fn load_from(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::with_name(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("SURVEY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
