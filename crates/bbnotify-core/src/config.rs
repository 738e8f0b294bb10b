// SPDX-License-Identifier: Apache-2.0

//! Configuration management for bbnotify.
//!
//! The credential store document doubles as the application configuration:
//! each top-level object is deserialised into a typed section once at start-up.
//!
//! # Location (in priority order)
//!
//! 1. `--config <path>` / `BBNOTIFY_CONFIG`
//! 2. `$XDG_CONFIG_HOME/bbnotify/config.json`
//! 3. `~/.config/bbnotify/config.json`
//!
//! # Example
//!
//! ```json
//! {
//!   "bitbucket": {
//!     "clientId": "...", "clientSecret": "...",
//!     "accessToken": "...", "refreshToken": "..."
//!   },
//!   "gmail": {
//!     "user": "team@example.com",
//!     "clientId": "...", "clientSecret": "...",
//!     "accessToken": "...", "refreshToken": "..."
//!   },
//!   "jira": { "domain": "acme", "username": "bot", "authorisationToken": "..." },
//!   "notification": {
//!     "owner": "acme", "repoSlug": "backend",
//!     "sender": "team@example.com", "to": ["dev@example.com"],
//!     "destinationBranch": "develop", "addTicketLinks": true
//!   }
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::credentials::Credentials;
use crate::error::NotifyError;
use crate::oauth::{BITBUCKET_OAUTH_URL, GOOGLE_OAUTH_URL};
use crate::store::CredentialStore;

/// Default Bitbucket Cloud REST API root.
pub const DEFAULT_BITBUCKET_API_URL: &str = "https://api.bitbucket.org/2.0";

/// Default Gmail REST API root.
pub const DEFAULT_GMAIL_API_URL: &str = "https://gmail.googleapis.com";

/// Default ticket id pattern (e.g. `FOO-666`).
pub const DEFAULT_TICKET_PATTERN: &str = "[A-Za-z]+-[0-9]+";

/// Default email subject.
pub const DEFAULT_SUBJECT: &str = "Merged pull requests in last 24h";

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "BBNOTIFY_CONFIG";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bitbucket OAuth consumer and tokens.
    pub bitbucket: BitbucketConfig,
    /// Gmail OAuth client and tokens (required only for sending).
    pub gmail: Option<GmailConfig>,
    /// Jira settings (ticket links and transitions are disabled without it).
    pub jira: Option<JiraConfig>,
    /// What to search for and who to notify.
    pub notification: NotificationConfig,
}

impl AppConfig {
    /// Builds the typed configuration from a loaded store.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingSection`] if `bitbucket` or
    /// `notification` is absent and [`NotifyError::InvalidSection`] if any
    /// present section has the wrong shape.
    pub fn from_store(store: &CredentialStore) -> Result<Self, NotifyError> {
        Ok(Self {
            bitbucket: store
                .section("bitbucket")?
                .ok_or(NotifyError::MissingSection {
                    section: "bitbucket",
                })?,
            gmail: store.section("gmail")?,
            jira: store.section("jira")?,
            notification: store
                .section("notification")?
                .ok_or(NotifyError::MissingSection {
                    section: "notification",
                })?,
        })
    }

    /// Returns the Gmail section or fails if it is not configured.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingSection`] when `gmail` is absent.
    pub fn require_gmail(&self) -> Result<&GmailConfig, NotifyError> {
        self.gmail
            .as_ref()
            .ok_or(NotifyError::MissingSection { section: "gmail" })
    }
}

/// `bitbucket` section.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketConfig {
    /// OAuth consumer key.
    #[serde(default)]
    pub client_id: String,
    /// OAuth consumer secret.
    #[serde(default)]
    pub client_secret: String,
    /// Current access token.
    #[serde(default)]
    pub access_token: String,
    /// Current refresh token.
    #[serde(default)]
    pub refresh_token: String,
    /// REST API root.
    #[serde(default = "default_bitbucket_api_url")]
    pub api_url: String,
    /// OAuth token endpoint.
    #[serde(default = "default_bitbucket_oauth_url")]
    pub oauth_url: String,
}

impl BitbucketConfig {
    /// Validated credentials for the `bitbucket` service.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingCredential`] naming the first empty field.
    pub fn credentials(&self) -> Result<Credentials, NotifyError> {
        Credentials::new(
            "bitbucket",
            &self.client_id,
            &self.client_secret,
            &self.access_token,
            &self.refresh_token,
        )
    }
}

impl fmt::Debug for BitbucketConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitbucketConfig")
            .field("client_id", &self.client_id)
            .field("api_url", &self.api_url)
            .field("oauth_url", &self.oauth_url)
            .finish_non_exhaustive()
    }
}

/// `gmail` section.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailConfig {
    /// Mailbox the messages are sent from; the `userId` of the send call
    /// (`me` selects the account the token belongs to).
    #[serde(default)]
    pub user: String,
    /// OAuth client id.
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Current access token.
    #[serde(default)]
    pub access_token: String,
    /// Current refresh token.
    #[serde(default)]
    pub refresh_token: String,
    /// OAuth token endpoint.
    #[serde(default = "default_gmail_token_url")]
    pub token_url: String,
    /// REST API root.
    #[serde(default = "default_gmail_api_url")]
    pub api_url: String,
}

impl GmailConfig {
    /// Validated credentials for the `gmail` service.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingCredential`] naming the first empty field.
    pub fn credentials(&self) -> Result<Credentials, NotifyError> {
        Credentials::new(
            "gmail",
            &self.client_id,
            &self.client_secret,
            &self.access_token,
            &self.refresh_token,
        )
    }
}

impl fmt::Debug for GmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GmailConfig")
            .field("user", &self.user)
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// `jira` section.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraConfig {
    /// Atlassian site name (`{domain}.atlassian.net`).
    pub domain: Option<String>,
    /// Account used for transitions.
    pub username: Option<String>,
    /// API token of that account.
    pub authorisation_token: Option<String>,
    /// Overrides `https://{domain}.atlassian.net` for REST calls.
    pub base_url: Option<String>,
}

impl fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraConfig")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// `notification` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    /// Repository owner (user or team).
    pub owner: String,
    /// Repository slug.
    pub repo_slug: String,
    /// Sender address.
    #[serde(default)]
    pub sender: String,
    /// Direct recipients.
    #[serde(default)]
    pub to: Vec<String>,
    /// Carbon-copy recipients.
    #[serde(default)]
    pub cc: Vec<String>,
    /// Blind carbon-copy recipients.
    #[serde(default)]
    pub bcc: Vec<String>,
    /// Email subject.
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Size of the look-back window.
    #[serde(default = "default_since_hours")]
    pub since_hours: u32,
    /// Pull request state to search for.
    #[serde(default = "default_state")]
    pub state: String,
    /// Destination branch to search for.
    pub destination_branch: Option<String>,
    /// Raw filter expression; overrides the structured fields.
    pub query: Option<String>,
    /// Link ticket ids to the tracker.
    #[serde(default)]
    pub add_ticket_links: bool,
    /// Regular expression matching ticket ids in titles.
    #[serde(default = "default_ticket_pattern")]
    pub ticket_pattern: String,
    /// Transition applied to every ticket after the email is sent.
    pub transition_id: Option<String>,
    /// Custom HTML template file.
    pub template: Option<PathBuf>,
}

fn default_bitbucket_api_url() -> String {
    DEFAULT_BITBUCKET_API_URL.to_string()
}

fn default_bitbucket_oauth_url() -> String {
    BITBUCKET_OAUTH_URL.to_string()
}

fn default_gmail_token_url() -> String {
    GOOGLE_OAUTH_URL.to_string()
}

fn default_gmail_api_url() -> String {
    DEFAULT_GMAIL_API_URL.to_string()
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_since_hours() -> u32 {
    24
}

fn default_state() -> String {
    "MERGED".to_string()
}

fn default_ticket_pattern() -> String {
    DEFAULT_TICKET_PATTERN.to_string()
}

/// Returns the bbnotify configuration directory.
///
/// Respects the `XDG_CONFIG_HOME` environment variable if set,
/// otherwise defaults to `~/.config/bbnotify`. Falls back to a relative
/// `.config/bbnotify` when no home directory can be determined.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join("bbnotify");
    }
    dirs::home_dir()
        .unwrap_or_default()
        .join(".config")
        .join("bbnotify")
}

/// Returns the default path to the configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Resolves the configuration file location.
///
/// An explicit path wins, then `BBNOTIFY_CONFIG`, then [`config_file_path`].
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(from_env) = std::env::var(CONFIG_ENV_VAR)
        && !from_env.is_empty()
    {
        return PathBuf::from(from_env);
    }
    config_file_path()
}

/// Reads the store at the resolved location and builds the typed configuration.
///
/// # Errors
///
/// Propagates store read failures and section errors from
/// [`AppConfig::from_store`].
pub fn load_config(explicit: Option<&Path>) -> Result<(CredentialStore, AppConfig), NotifyError> {
    let store = CredentialStore::read(resolve_config_path(explicit))?;
    let config = AppConfig::from_store(&store)?;
    Ok((store, config))
}
