use crate::engine::Variant;
use crate::engine::standards::{Profile, Standard};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "eai.toml";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    /// Weight overrides for parameters already in the active profile.
    pub weights: BTreeMap<String, f64>,
    /// Parameters added to, or replacing entries in, the active profile.
    pub standards: BTreeMap<String, Standard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub profile: Variant,
    pub fail_on: FailOn,
    pub json: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            profile: Variant::Nemerow,
            fail_on: FailOn::None,
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    Warning,
    Bad,
    #[default]
    None,
}

impl fmt::Display for FailOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Bad => write!(f, "bad"),
            Self::None => write!(f, "none"),
        }
    }
}

impl Config {
    /// Builds the profile used for assessment: the built-in table for the
    /// selected variant with configured standards and weights layered on top.
    pub fn build_profile(&self, variant_override: Option<Variant>) -> Result<Profile> {
        let variant = variant_override.unwrap_or(self.general.profile);
        let mut profile = Profile::builtin(variant).clone();

        for (name, standard) in &self.standards {
            profile.standards.insert(name.clone(), *standard);
        }

        for (name, weight) in &self.weights {
            if !profile.set_weight(name, *weight) {
                log::warn!("ignoring weight for {name}: no standard in the {variant} profile");
            }
        }

        profile
            .validate()
            .with_context(|| format!("invalid standards for the {variant} profile"))?;
        Ok(profile)
    }
}

pub fn load_config(cli_config_path: Option<&Path>, cwd: &Path) -> Result<LoadedConfig> {
    if let Some(path) = cli_config_path {
        if !path.exists() {
            bail!(
                "config file not found at {} (passed with --config)",
                path.display()
            );
        }

        return Ok(LoadedConfig {
            config: read_config(path)?,
            source: Some(path.to_path_buf()),
        });
    }

    let local_path = cwd.join(CONFIG_FILE_NAME);
    if local_path.exists() {
        return Ok(LoadedConfig {
            config: read_config(&local_path)?,
            source: Some(local_path),
        });
    }

    log::debug!("no {CONFIG_FILE_NAME} found, using defaults");
    Ok(LoadedConfig {
        config: Config::default(),
        source: None,
    })
}

pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!(
            "refusing to overwrite existing config file: {}",
            path.display()
        );
    }

    let content = default_config_toml()?;
    fs::write(path, content).with_context(|| format!("failed writing {}", path.display()))?;
    Ok(())
}

pub fn default_config_toml() -> Result<String> {
    toml::to_string_pretty(&Config::default()).context("failed to serialize default config")
}

fn read_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed reading config file {}", path.display()))?;
    let config = toml::from_str::<Config>(&content)
        .with_context(|| format!("failed parsing config file {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = default_config_toml().expect("serialize");
        let parsed: Config = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.general.profile, Variant::Nemerow);
        assert_eq!(parsed.general.fail_on, FailOn::None);
        assert!(parsed.standards.is_empty());
    }

    #[test]
    fn overrides_layer_onto_builtin_profile() {
        let cfg: Config = toml::from_str(
            r#"
[general]
profile = "geometric"

[weights]
ph = 0.5
not_a_parameter = 9.0

[standards.do_sau]
kind = "range_optimal"
lower = 1.0
upper = 5.0
weight = 0.05
"#,
        )
        .expect("parse");

        let profile = cfg.build_profile(None).expect("profile");
        assert_eq!(profile.variant, Variant::Geometric);
        assert_eq!(profile.weight_for("ph"), 0.5);
        assert_eq!(profile.weight_for("do_sau"), 0.05);
        assert!(profile.standard("not_a_parameter").is_none());

        let nemerow = cfg.build_profile(Some(Variant::Nemerow)).expect("profile");
        assert_eq!(nemerow.variant, Variant::Nemerow);
        assert_eq!(nemerow.weight_for("ph"), 0.5);
    }

    #[test]
    fn corrupted_standard_is_fatal() {
        let cfg: Config = toml::from_str(
            r#"
[standards.ph]
kind = "range_optimal"
lower = 9.0
upper = 6.0
"#,
        )
        .expect("parse");

        let err = cfg.build_profile(None).expect_err("inverted range");
        assert!(format!("{err:#}").contains("lower bound 9 above upper bound 6"));
    }

    #[test]
    fn load_prefers_explicit_path_then_local_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load_config(None, dir.path()).expect("defaults");
        assert!(loaded.source.is_none());

        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[general]\nprofile = \"geometric\"\n",
        )
        .expect("write");
        let loaded = load_config(None, dir.path()).expect("local");
        assert_eq!(loaded.config.general.profile, Variant::Geometric);

        let missing = dir.path().join("missing.toml");
        assert!(load_config(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        write_default_config(&path).expect("first write");
        assert!(write_default_config(&path).is_err());
    }
}
