//! # Roster Configuration
//!
//! Configuration management for the reorder engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ROSTER_COLLECTION=client_types                                     │
//! │     ROSTER_BUSY_POLICY=reject                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/roster/roster.toml (Linux)                               │
//! │     ~/Library/Application Support/com.roster.roster/roster.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     collection "client_types", BusyPolicy::Queue                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # roster.toml
//! [collection]
//! name = "client_types"
//!
//! [reorder]
//! busy_policy = "queue"  # queue | reject
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Busy Policy
// =============================================================================

/// What happens to a gesture that arrives while a patch is in flight.
///
/// ## Policy Comparison
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                        Busy Policy Behavior                             │
/// │                                                                         │
/// │  QUEUE (Default)                    │  REJECT                           │
/// │  ───────────────                    │  ──────                           │
/// │  • Waits for the in-flight patch    │  • Returns SyncError::Busy        │
/// │    to settle (success or rollback)  │    immediately                    │
/// │  • Then diffs against the updated   │  • Nothing is displayed or sent   │
/// │    confirmed baseline               │  • The surface may retry          │
/// │  • Gestures run in arrival order    │                                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Serialize gestures behind the in-flight patch.
    #[default]
    Queue,

    /// Refuse gestures while a patch is in flight.
    Reject,
}

impl std::fmt::Display for BusyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusyPolicy::Queue => write!(f, "queue"),
            BusyPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for BusyPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queue" | "serialize" => Ok(BusyPolicy::Queue),
            "reject" | "busy" => Ok(BusyPolicy::Reject),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown busy policy: '{}'. Valid options: queue, reject",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Which collection this screen edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Collection name, used in log fields.
    #[serde(default = "default_collection_name")]
    pub name: String,
}

fn default_collection_name() -> String {
    "client_types".to_string()
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfig {
            name: default_collection_name(),
        }
    }
}

/// Reorder engine behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReorderSettings {
    /// Policy for gestures arriving while a patch is in flight.
    #[serde(default)]
    pub busy_policy: BusyPolicy,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete roster configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Collection settings.
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Reorder engine settings.
    #[serde(default)]
    pub reorder: ReorderSettings,
}

impl RosterConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the busy policy.
    pub fn with_busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.reorder.busy_policy = policy;
        self
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (roster.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading roster config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load roster config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Roster config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.collection.name.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "collection.name must not be empty".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("ROSTER_COLLECTION") {
            debug!(collection = %name, "Overriding collection from environment");
            self.collection.name = name;
        }

        if let Ok(policy) = std::env::var("ROSTER_BUSY_POLICY") {
            match policy.parse() {
                Ok(parsed) => {
                    debug!(policy = %policy, "Overriding busy policy from environment");
                    self.reorder.busy_policy = parsed;
                }
                Err(_) => warn!(policy = %policy, "Unknown busy policy in environment"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "roster", "roster")
            .map(|dirs| dirs.config_dir().join("roster.toml"))
    }

    /// Returns the busy policy.
    pub fn busy_policy(&self) -> BusyPolicy {
        self.reorder.busy_policy
    }

    /// Returns the collection name.
    pub fn collection_name(&self) -> &str {
        &self.collection.name
    }
}
