use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use presage_analysis::DEFAULT_SHUFFLES;
use presage_core::Channel;
use presage_experiment::ExperimentConfig;
use presage_rng::RandomSourceKind;
use presage_sensor::SampleRate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Neulog recording settings. Leaving the block out disables recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysiologyConfig {
    pub port: u16,
    pub rate: SampleRate,
    pub channels: Vec<Channel>,
}

impl Default for PhysiologyConfig {
    fn default() -> Self {
        Self {
            port: 22002,
            rate: SampleRate::default(),
            channels: vec![Channel::SkinConductance, Channel::HeartRate],
        }
    }
}

/// Everything `presage run` needs, read from one JSON file.
///
/// `random_source` has no default: a file that leaves it out is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(flatten)]
    pub experiment: ExperimentConfig,
    pub random_source: RandomSourceKind,
    #[serde(default = "default_neutral_dir")]
    pub neutral_dir: PathBuf,
    #[serde(default = "default_excitatory_dir")]
    pub excitatory_dir: PathBuf,
    #[serde(default = "default_physiology")]
    pub physiology: Option<PhysiologyConfig>,
    #[serde(default = "default_shuffle_count")]
    pub shuffle_count: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Keys no other field claimed; `validate` rejects any.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

fn default_session_id() -> String {
    "session".into()
}

fn default_neutral_dir() -> PathBuf {
    PathBuf::from("stimuli/neutral")
}

fn default_excitatory_dir() -> PathBuf {
    PathBuf::from("stimuli/excitatory")
}

fn default_physiology() -> Option<PhysiologyConfig> {
    Some(PhysiologyConfig::default())
}

fn default_shuffle_count() -> usize {
    DEFAULT_SHUFFLES
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("sessions")
}

/// The template printed by `presage default-config`.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session_id: default_session_id(),
            experiment: ExperimentConfig::default(),
            random_source: RandomSourceKind::Pseudo,
            neutral_dir: default_neutral_dir(),
            excitatory_dir: default_excitatory_dir(),
            physiology: default_physiology(),
            shuffle_count: default_shuffle_count(),
            output_dir: default_output_dir(),
            unknown: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.unknown.is_empty() {
            let keys: Vec<&str> = self.unknown.keys().map(String::as_str).collect();
            bail!("unknown config key(s): {}", keys.join(", "));
        }
        self.experiment.validate()?;
        if self.shuffle_count == 0 {
            bail!("shuffle_count must be positive");
        }
        if self.session_id.trim().is_empty() {
            bail!("session_id must not be empty");
        }
        if let Some(physiology) = &self.physiology {
            if physiology.channels.is_empty() {
                bail!("physiology block lists no channels");
            }
        }
        Ok(())
    }

    /// Directory the session's exports are written to.
    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_id)
    }
}
