//! Typed runtime configuration.
//!
//! Loaded from an optional TOML file overlaid with `AUTOTEST__*` environment
//! variables, where a double underscore separates nesting levels
//! (`AUTOTEST__PUBLISH__ENABLED=false`).

use crate::results::domain::{CourseId, DeliverableId, InstanceKind, ResultsDomainError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "AUTOTEST";

const DEFAULT_FEEDBACK_INTERVAL_SECS: u64 = 12 * 60 * 60;
const DEFAULT_RECHECK_INTERVAL_SECS: u64 = 60;
const DEFAULT_RECHECK_ATTEMPTS: u32 = 10;
const DEFAULT_POOL_SIZE: u32 = 4;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(Box<::config::ConfigError>),

    /// An identifier in the configuration is malformed.
    #[error("invalid identifier in configuration: {0}")]
    InvalidIdentifier(#[from] ResultsDomainError),

    /// A duration that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    /// Deferred requests would time out without a single re-check.
    #[error("recheck.max_attempts must be greater than zero")]
    ZeroRecheckAttempts,

    /// The default deliverable has no entry in `deliverables`.
    #[error("default deliverable '{0}' is not configured")]
    UnknownDefaultDeliverable(String),

    /// Publishing is enabled without an access token.
    #[error("publishing is enabled but no token is configured")]
    MissingToken,
}

impl From<::config::ConfigError> for ConfigError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Load(Box::new(err))
    }
}

/// Policy for one deliverable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeliverableSettings {
    /// Minimum time between feedback posts for one user.
    pub feedback_interval_secs: Option<u64>,
    /// Whether students may currently request feedback.
    pub open: bool,
}

impl Default for DeliverableSettings {
    fn default() -> Self {
        Self {
            feedback_interval_secs: None,
            open: true,
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    /// One JSON-lines file per collection under `dir`.
    File {
        /// Store directory, created when missing.
        dir: String,
    },
    /// `PostgreSQL` document table.
    Postgres {
        /// Connection URL.
        url: String,
        /// Maximum pooled connections.
        #[serde(default = "default_pool_size")]
        pool_size: u32,
    },
}

const fn default_pool_size() -> u32 {
    DEFAULT_POOL_SIZE
}

impl StorageConfig {
    /// Returns the backend name used in configuration.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
            Self::Postgres { .. } => "postgres",
        }
    }
}

/// Feedback publishing settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// When `false`, messages are recorded but never sent.
    pub enabled: bool,
    /// Base URL of the repository host API.
    pub api_base_url: String,
    /// Access token sent with each post.
    pub token: Option<String>,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base_url: "https://api.github.com".to_owned(),
            token: None,
            user_agent: concat!("autotest/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("enabled", &self.enabled)
            .field("api_base_url", &self.api_base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Bounds on how long a feedback request waits for a missing result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecheckConfig {
    /// Delay between re-checks.
    pub interval_secs: u64,
    /// Number of re-checks before giving up.
    pub max_attempts: u32,
}

impl Default for RecheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_RECHECK_INTERVAL_SECS,
            max_attempts: DEFAULT_RECHECK_ATTEMPTS,
        }
    }
}

impl RecheckConfig {
    /// Returns the re-check interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AutotestConfig {
    /// Instance kind; only `test` permits clearing the store.
    pub instance: InstanceKind,
    /// Course served by this instance.
    pub course_id: String,
    /// Deliverable used when a request names none.
    pub default_deliverable: Option<String>,
    /// Per-deliverable policy.
    pub deliverables: BTreeMap<String, DeliverableSettings>,
    /// Interval applied to deliverables without their own.
    pub default_feedback_interval_secs: u64,
    /// Storage backend.
    pub storage: StorageConfig,
    /// Feedback publishing.
    pub publish: PublishConfig,
    /// Deferred re-check bounds.
    pub recheck: RecheckConfig,
    /// Post quota denials on the commit instead of only returning them.
    pub post_denials: bool,
}

impl Default for AutotestConfig {
    fn default() -> Self {
        Self {
            instance: InstanceKind::default(),
            course_id: "default".to_owned(),
            default_deliverable: None,
            deliverables: BTreeMap::new(),
            default_feedback_interval_secs: DEFAULT_FEEDBACK_INTERVAL_SECS,
            storage: StorageConfig::default(),
            publish: PublishConfig::default(),
            recheck: RecheckConfig::default(),
            post_denials: true,
        }
    }
}

impl AutotestConfig {
    /// Loads configuration from `path` (when given) and the environment,
    /// then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a source cannot be parsed or the merged
    /// configuration is invalid.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(file) = path {
            builder = builder.add_source(::config::File::with_name(file).required(true));
        }
        let loaded: Self = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for zero intervals or re-check attempts, an unconfigured default
    /// deliverable, malformed identifiers, or publishing without a token.
    pub fn validate(&self) -> Result<(), ConfigError> {
        CourseId::new(self.course_id.as_str())?;
        if self.default_feedback_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("default_feedback_interval_secs"));
        }
        if self.recheck.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("recheck.interval_secs"));
        }
        if self.recheck.max_attempts == 0 {
            return Err(ConfigError::ZeroRecheckAttempts);
        }
        for (id, settings) in &self.deliverables {
            DeliverableId::new(id.as_str())?;
            if settings.feedback_interval_secs == Some(0) {
                return Err(ConfigError::ZeroInterval("deliverables.feedback_interval_secs"));
            }
        }
        if let Some(default) = &self.default_deliverable {
            let normalized = DeliverableId::new(default.as_str())?;
            if !self.deliverables_by_id()?.contains_key(&normalized) {
                return Err(ConfigError::UnknownDefaultDeliverable(default.clone()));
            }
        }
        if self.publish.enabled && self.publish.token.is_none() {
            return Err(ConfigError::MissingToken);
        }
        Ok(())
    }

    /// Returns the configured course.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIdentifier`] for a malformed course id.
    pub fn course(&self) -> Result<CourseId, ConfigError> {
        Ok(CourseId::new(self.course_id.as_str())?)
    }

    /// Returns the deliverable policies keyed by validated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIdentifier`] for a malformed id.
    pub fn deliverables_by_id(
        &self,
    ) -> Result<BTreeMap<DeliverableId, DeliverableSettings>, ConfigError> {
        self.deliverables
            .iter()
            .map(|(id, settings)| Ok((DeliverableId::new(id.as_str())?, settings.clone())))
            .collect()
    }

    /// Returns the validated default deliverable, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIdentifier`] for a malformed id.
    pub fn default_deliverable_id(&self) -> Result<Option<DeliverableId>, ConfigError> {
        self.default_deliverable
            .as_deref()
            .map(DeliverableId::new)
            .transpose()
            .map_err(ConfigError::from)
    }

    /// Returns the fallback feedback interval.
    #[must_use]
    pub const fn default_feedback_interval(&self) -> Duration {
        Duration::from_secs(self.default_feedback_interval_secs)
    }
}
