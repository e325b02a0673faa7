// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestThreads;
use crate::errors::{ConfigParseError, ProfileNotFound};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use itertools::Itertools;
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashMap},
    sync::LazyLock,
    time::Duration,
};
use tracing::warn;

/// Gets the number of available CPUs and caches the value.
#[inline]
pub fn get_num_cpus() -> usize {
    static NUM_CPUS: LazyLock<usize> =
        LazyLock::new(|| match std::thread::available_parallelism() {
            Ok(count) => count.into(),
            Err(err) => {
                warn!("unable to determine num-cpus ({err}), assuming 1 logical CPU");
                1
            }
        });

    *NUM_CPUS
}

/// Overall configuration for unitrun.
///
/// Runner settings are managed through [profiles](RunnerProfile), obtained through the
/// [`profile`](Self::profile) method.
#[derive(Clone, Debug)]
pub struct UnitrunConfig {
    inner: UnitrunConfigImpl,
    unknown_keys: BTreeSet<String>,
}

impl UnitrunConfig {
    /// The default location of the config within the path: `.config/unitrun.toml`, used to read
    /// the config from the given directory.
    pub const CONFIG_PATH: &'static str = ".config/unitrun.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the config from the given file, or if not specified from `.config/unitrun.toml` in
    /// the workspace root.
    ///
    /// If the file isn't specified and the directory doesn't have `.config/unitrun.toml`, uses the
    /// default config options. Unknown keys are logged as warnings.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();

        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (deserialized, unknown_keys) = Self::build_and_deserialize_config(&builder)
            .map_err(|err| ConfigParseError::new(&config_file, err))?;

        if !unknown_keys.is_empty() {
            warn!(
                "ignoring unknown configuration keys in {config_file}: {}",
                unknown_keys.iter().join(", ")
            );
        }

        let inner = deserialized
            .into_config_impl()
            .map_err(|err| ConfigParseError::new(&config_file, err))?;

        Ok(Self {
            inner,
            unknown_keys,
        })
    }

    /// Returns the default config, without reading any files.
    #[cfg(test)]
    pub(crate) fn default_config() -> Self {
        let (deserialized, unknown_keys) =
            Self::build_and_deserialize_config(&Self::make_default_config())
                .expect("default config is always valid");
        let inner = deserialized
            .into_config_impl()
            .expect("default config is always valid");

        Self {
            inner,
            unknown_keys,
        }
    }

    /// Returns the keys that were present in config files but not recognized.
    pub fn unknown_keys(&self) -> &BTreeSet<String> {
        &self.unknown_keys
    }

    /// Returns the profile with the given name, or an error if a profile was specified but not
    /// found.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<RunnerProfile<'_>, ProfileNotFound> {
        let name = name.as_ref();
        let custom_profile = match name {
            Self::DEFAULT_PROFILE => None,
            other => Some(
                self.inner
                    .other_profiles
                    .get(other)
                    .ok_or_else(|| ProfileNotFound::new(name, self.inner.all_profiles()))?,
            ),
        };

        Ok(RunnerProfile {
            name: name.to_owned(),
            default_profile: &self.inner.default_profile,
            custom_profile,
        })
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(UnitrunConfigDeserialize, BTreeSet<String>), ConfigError> {
        let config = builder.build_cloned()?;

        let mut ignored = BTreeSet::new();
        let config: UnitrunConfigDeserialize =
            serde_ignored::deserialize(config, |path: serde_ignored::Path| {
                ignored.insert(path.to_string());
            })?;

        Ok((config, ignored))
    }
}

/// A unitrun profile, containing settings for how a run should be executed.
///
/// Settings that aren't specified in a custom profile fall back to the default profile.
#[derive(Clone, Debug)]
pub struct RunnerProfile<'cfg> {
    name: String,
    default_profile: &'cfg DefaultProfileImpl,
    custom_profile: Option<&'cfg CustomProfileImpl>,
}

impl RunnerProfile<'_> {
    /// Returns the name of the profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the time budget for units that don't specify their own timeout.
    pub fn default_timeout(&self) -> Duration {
        self.custom_profile
            .and_then(|profile| profile.default_timeout)
            .unwrap_or(self.default_profile.default_timeout)
    }

    /// Returns the number of units to run simultaneously.
    pub fn test_threads(&self) -> TestThreads {
        self.custom_profile
            .and_then(|profile| profile.test_threads)
            .unwrap_or(self.default_profile.test_threads)
    }

    /// Returns true if unit timeouts should never be enforced.
    pub fn suppress_timeouts(&self) -> bool {
        self.custom_profile
            .and_then(|profile| profile.suppress_timeouts)
            .unwrap_or(self.default_profile.suppress_timeouts)
    }
}

#[derive(Clone, Debug)]
struct UnitrunConfigImpl {
    default_profile: DefaultProfileImpl,
    other_profiles: HashMap<String, CustomProfileImpl>,
}

impl UnitrunConfigImpl {
    fn all_profiles(&self) -> impl Iterator<Item = &str> {
        self.other_profiles
            .keys()
            .map(|key| key.as_str())
            .chain(std::iter::once(UnitrunConfig::DEFAULT_PROFILE))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UnitrunConfigDeserialize {
    #[serde(rename = "profile")]
    profiles: HashMap<String, CustomProfileImpl>,
}

impl UnitrunConfigDeserialize {
    fn into_config_impl(mut self) -> Result<UnitrunConfigImpl, ConfigError> {
        for (name, profile) in &self.profiles {
            if profile.default_timeout == Some(Duration::ZERO) {
                return Err(ConfigError::Message(format!(
                    "profile.{name}.default-timeout must be greater than zero"
                )));
            }
        }

        let default_profile = self
            .profiles
            .remove(UnitrunConfig::DEFAULT_PROFILE)
            .and_then(DefaultProfileImpl::new)
            .ok_or_else(|| {
                ConfigError::Message("default profile is missing required keys".to_owned())
            })?;

        Ok(UnitrunConfigImpl {
            default_profile,
            other_profiles: self.profiles,
        })
    }
}

#[derive(Clone, Debug)]
struct DefaultProfileImpl {
    default_timeout: Duration,
    test_threads: TestThreads,
    suppress_timeouts: bool,
}

impl DefaultProfileImpl {
    // The embedded default config sets every key, so this only fails if a repository config
    // somehow unsets one.
    fn new(p: CustomProfileImpl) -> Option<Self> {
        Some(Self {
            default_timeout: p.default_timeout?,
            test_threads: p.test_threads?,
            suppress_timeouts: p.suppress_timeouts?,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default, with = "humantime_serde")]
    default_timeout: Option<Duration>,
    #[serde(default)]
    test_threads: Option<TestThreads>,
    #[serde(default)]
    suppress_timeouts: Option<bool>,
}
