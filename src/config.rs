//! Configuration for flowgate.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (FLOWGATE_HOME, FLOWGATE_DB, FLOWGATE_ADMIN_USER_ID,
//!    FLOWGATE_ADMIN_USERGROUP_ID, FLOWGATE_REVIEW_CHANNEL, FLOWGATE_API_BASE)
//! 2. Config file (.flowgate/config.yaml)
//! 3. Defaults (~/.flowgate)
//!
//! Config file discovery:
//! - Searches current directory and parents for .flowgate/config.yaml
//! - The store path in the config file is relative to the project root
//!
//! API tokens are read from the environment only (SLACK_USER_TOKEN,
//! SLACK_BOT_TOKEN, SLACK_COOKIE).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::adapters::SlackConfig;
use crate::core::{GovernanceSettings, ReviewChannel};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_API_BASE: &str = "https://slack.com/api/";
const DEFAULT_LINK_BASE: &str = "https://slack.com/shortcuts/";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DATABASE_FILE: &str = "governance.db";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub governance: GovernanceSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub api: ApiSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GovernanceSection {
    pub admin_user_id: Option<String>,
    pub admin_usergroup_id: Option<String>,
    pub review_channel: Option<String>,
    pub link_base: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSection {
    /// Database file (relative to the project root)
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// API secrets, never printed
#[derive(Clone, Default)]
pub struct Credentials {
    pub user_token: Option<String>,
    pub bot_token: Option<String>,
    pub session_cookie: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("user_token", &mask(&self.user_token))
            .field("bot_token", &mask(&self.bot_token))
            .field("session_cookie", &mask(&self.session_cookie))
            .finish()
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Engine state directory
    pub home: PathBuf,
    /// Governance database
    pub database: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub governance: GovernanceSettings,
    pub api_base: String,
    pub timeout_seconds: u64,
    pub credentials: Credentials,
}

impl ResolvedConfig {
    /// Slack client settings; fails when either token is missing
    pub fn slack_config(&self) -> Result<SlackConfig> {
        let user_token = self
            .credentials
            .user_token
            .clone()
            .context("SLACK_USER_TOKEN is not set")?;
        let bot_token = self
            .credentials
            .bot_token
            .clone()
            .context("SLACK_BOT_TOKEN is not set")?;

        Ok(SlackConfig {
            base_url: self.api_base.clone(),
            user_token,
            bot_token,
            session_cookie: self.credentials.session_cookie.clone(),
            timeout_seconds: self.timeout_seconds,
        })
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".flowgate").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Build the configuration from a parsed file and an environment lookup
fn resolve<F>(
    file: Option<(&Path, ConfigFile)>,
    env: F,
    default_home: PathBuf,
) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let (config_file, parsed) = match file {
        Some((path, parsed)) => (Some(path.to_path_buf()), parsed),
        None => (None, ConfigFile::default()),
    };

    // Project root is the parent of .flowgate/
    let project_root = config_file
        .as_deref()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .map(Path::to_path_buf);

    let home = env("FLOWGATE_HOME")
        .map(PathBuf::from)
        .unwrap_or(default_home);

    let database = if let Some(db) = env("FLOWGATE_DB") {
        PathBuf::from(db)
    } else if let (Some(root), Some(db)) = (project_root.as_deref(), parsed.store.path.as_deref()) {
        resolve_path(root, db)
    } else {
        home.join(DATABASE_FILE)
    };

    let governance = parsed.governance;
    let admin_user_id = env("FLOWGATE_ADMIN_USER_ID")
        .or(governance.admin_user_id)
        .filter(|v| !v.trim().is_empty());
    let Some(admin_user_id) = admin_user_id else {
        bail!("Admin identity is not configured (FLOWGATE_ADMIN_USER_ID or governance.admin_user_id)");
    };

    let review_channel = env("FLOWGATE_REVIEW_CHANNEL")
        .or(governance.review_channel)
        .filter(|v| !v.trim().is_empty());
    let Some(review_channel) = review_channel else {
        bail!("Review channel is not configured (FLOWGATE_REVIEW_CHANNEL or governance.review_channel)");
    };

    let usergroup_id = env("FLOWGATE_ADMIN_USERGROUP_ID")
        .or(governance.admin_usergroup_id)
        .unwrap_or_default();

    let api_base = env("FLOWGATE_API_BASE")
        .or(parsed.api.base_url)
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

    Ok(ResolvedConfig {
        home,
        database,
        config_file,
        governance: GovernanceSettings {
            admin_user_id,
            review_channel: ReviewChannel {
                channel_id: review_channel,
                usergroup_id,
            },
            link_base: governance
                .link_base
                .unwrap_or_else(|| DEFAULT_LINK_BASE.to_string()),
        },
        api_base,
        timeout_seconds: parsed.api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        credentials: Credentials {
            user_token: env("SLACK_USER_TOKEN"),
            bot_token: env("SLACK_BOT_TOKEN"),
            session_cookie: env("SLACK_COOKIE"),
        },
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".flowgate");

    let file = match find_config_file() {
        Some(path) => {
            let parsed = load_config_file(&path)?;
            Some((path, parsed))
        }
        None => None,
    };

    resolve(
        file.as_ref().map(|(p, c)| (p.as_path(), c.clone())),
        |key| std::env::var(key).ok(),
        default_home,
    )
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => bail!("{}", e),
    }
}
