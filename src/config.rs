//! Module configuration types.
//!
//! Resenders take typed configs with sensible defaults. Deployments that
//! describe modules as flat AS2-style attribute maps (`resenddelay`,
//! `pollinginterval`, `resenddir`, `errordir`) convert them with
//! [`ModuleAttributes`].

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::{lifecycle::PollerConfig, resend::DEFAULT_RESEND_DELAY};

/// Attribute naming the resend delay in seconds.
pub const RESEND_DELAY: &str = "resenddelay";
/// Attribute naming the polling interval in seconds.
pub const POLLING_INTERVAL: &str = "pollinginterval";
/// Attribute naming the durable resend directory.
pub const RESEND_DIR: &str = "resenddir";
/// Attribute naming the directory failed resend files are moved to.
pub const ERROR_DIR: &str = "errordir";

/// Errors raised while reading module attributes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required attribute is absent.
    #[error("missing required attribute `{0}`")]
    Missing(&'static str),
    /// An attribute value could not be parsed.
    #[error("invalid value {value:?} for attribute `{key}`")]
    Invalid {
        /// Attribute name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Timing shared by queueing resenders.
///
/// # Default Values
/// - `resend_delay`: [`DEFAULT_RESEND_DELAY`]
/// - `polling`: [`PollerConfig::default`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResenderConfig {
    /// Delay between a resend request and its first attempt.
    pub resend_delay: Duration,
    /// Poll task timing.
    pub polling: PollerConfig,
}

impl Default for ResenderConfig {
    fn default() -> Self {
        Self {
            resend_delay: DEFAULT_RESEND_DELAY,
            polling: PollerConfig::default(),
        }
    }
}

/// Configuration of the durable directory resender.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DirectoryResenderConfig {
    /// Directory holding pending resend files.
    pub resend_dir: PathBuf,
    /// Directory receiving files that failed permanently.
    pub error_dir: PathBuf,
    /// Delay and polling timing.
    #[serde(default, flatten)]
    pub timing: ResenderConfig,
}

impl DirectoryResenderConfig {
    /// Configuration with default timing.
    #[must_use]
    pub fn new(resend_dir: impl Into<PathBuf>, error_dir: impl Into<PathBuf>) -> Self {
        Self {
            resend_dir: resend_dir.into(),
            error_dir: error_dir.into(),
            timing: ResenderConfig::default(),
        }
    }
}

/// Flat string attributes describing a module.
///
/// ```
/// use std::time::Duration;
///
/// use as2relay::config::ModuleAttributes;
///
/// let attrs: ModuleAttributes = [("resenddelay", "15"), ("pollinginterval", "5")]
///     .into_iter()
///     .collect();
/// let config = attrs.resender_config().expect("valid attributes");
/// assert_eq!(config.resend_delay, Duration::from_secs(15));
/// assert_eq!(config.polling.period, Duration::from_secs(5));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModuleAttributes(BTreeMap<String, String>);

impl ModuleAttributes {
    /// Look up a raw attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> { self.0.get(key).map(String::as_str) }

    /// Timing for a queueing resender; absent attributes keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a duration is not a whole number
    /// of seconds.
    pub fn resender_config(&self) -> Result<ResenderConfig, ConfigError> {
        let mut config = ResenderConfig::default();
        if let Some(delay) = self.seconds(RESEND_DELAY)? {
            config.resend_delay = delay;
        }
        if let Some(period) = self.seconds(POLLING_INTERVAL)? {
            config.polling.period = period;
        }
        config.polling = config.polling.normalized();
        Ok(config)
    }

    /// Configuration for a [`crate::resend::DirectoryResender`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if either directory is absent, or
    /// [`ConfigError::Invalid`] for a malformed duration.
    pub fn directory_resender_config(&self) -> Result<DirectoryResenderConfig, ConfigError> {
        let resend_dir = self.get(RESEND_DIR).ok_or(ConfigError::Missing(RESEND_DIR))?;
        let error_dir = self.get(ERROR_DIR).ok_or(ConfigError::Missing(ERROR_DIR))?;
        Ok(DirectoryResenderConfig {
            resend_dir: resend_dir.into(),
            error_dir: error_dir.into(),
            timing: self.resender_config()?,
        })
    }

    fn seconds(&self, key: &'static str) -> Result<Option<Duration>, ConfigError> {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::Invalid {
                        key,
                        value: raw.to_owned(),
                    })
            })
            .transpose()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ModuleAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
