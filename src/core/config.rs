//! Job configuration from YAML

use crate::core::job::JobDescription;
use crate::core::step::{Step, StepDefaults};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level job configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job name
    pub name: String,

    /// Container image reference for the execution environment
    pub image: String,

    /// Repository URL for checkout steps (optional; without it, checkout
    /// steps expect a pre-populated workspace)
    #[serde(default)]
    pub repository: Option<String>,

    /// Branch or tag to check out
    #[serde(default)]
    pub reference: Option<String>,

    /// Default timeout for run steps (in seconds)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,

    /// Overall time budget for the run (in seconds)
    #[serde(default)]
    pub max_duration_secs: Option<u64>,

    /// Ordered job steps
    pub steps: Vec<StepConfig>,
}

/// Step configuration as defined in YAML.
///
/// Externally tagged, so a bare `- checkout` list item is the checkout
/// step and `- run: {...}` / `- restore_cache: {...}` / `- save_cache: {...}`
/// carry their fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepConfig {
    /// Populate the workspace from source control
    Checkout,

    /// Run a shell command
    Run {
        /// Human-readable step name (defaults to the command)
        #[serde(default)]
        name: Option<String>,

        /// Command passed to the shell
        command: String,

        /// Timeout for this step (overrides the job default)
        #[serde(default)]
        timeout_secs: Option<u64>,
    },

    /// Restore a cache entry
    RestoreCache { key: String },

    /// Save workspace paths under a cache key
    SaveCache {
        key: String,

        /// Workspace-relative paths to snapshot
        #[serde(default)]
        paths: Vec<String>,
    },
}

impl JobConfig {
    /// Load job configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse job configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: JobConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the job configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("job name must not be empty");
        }
        if self.image.trim().is_empty() {
            anyhow::bail!("job '{}' has no image reference", self.name);
        }
        if self.steps.is_empty() {
            anyhow::bail!("job '{}' has no steps", self.name);
        }

        for (index, step) in self.steps.iter().enumerate() {
            match step {
                StepConfig::Checkout => {}
                StepConfig::Run { command, .. } => {
                    if command.trim().is_empty() {
                        anyhow::bail!("step {} has an empty command", index + 1);
                    }
                }
                StepConfig::RestoreCache { key } => {
                    if key.trim().is_empty() {
                        anyhow::bail!("step {} has an empty cache key", index + 1);
                    }
                }
                StepConfig::SaveCache { key, paths } => {
                    if key.trim().is_empty() {
                        anyhow::bail!("step {} has an empty cache key", index + 1);
                    }
                    if paths.is_empty() {
                        anyhow::bail!(
                            "step {} saves cache key '{}' but declares no paths",
                            index + 1,
                            key
                        );
                    }
                    for path in paths {
                        let p = Path::new(path);
                        if p.is_absolute() || path.starts_with("..") {
                            anyhow::bail!(
                                "cache path '{}' must be relative to the workspace",
                                path
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Build the immutable job description
    pub fn to_job(&self) -> JobDescription {
        let defaults = StepDefaults {
            timeout_secs: self.default_timeout_secs.unwrap_or_else(|| StepDefaults::default().timeout_secs),
        };

        let steps = self
            .steps
            .iter()
            .map(|step| match step {
                StepConfig::Checkout => Step::Checkout,
                StepConfig::Run {
                    name,
                    command,
                    timeout_secs,
                } => Step::Run {
                    name: name.clone().unwrap_or_else(|| command.clone()),
                    command: command.clone(),
                    timeout_secs: timeout_secs.unwrap_or(defaults.timeout_secs),
                },
                StepConfig::RestoreCache { key } => Step::RestoreCache { key: key.clone() },
                StepConfig::SaveCache { key, paths } => Step::SaveCache {
                    key: key.clone(),
                    paths: paths.clone(),
                },
            })
            .collect();

        JobDescription {
            name: self.name.clone(),
            image: self.image.clone(),
            repository: self.repository.clone(),
            reference: self.reference.clone(),
            max_duration_secs: self.max_duration_secs,
            steps,
        }
    }
}
