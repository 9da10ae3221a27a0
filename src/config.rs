use std::fmt;
use std::path::Path;
use std::time::Duration;

use config::{Config, File, FileFormat};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::fetch::DEFAULT_TIMEOUT;
use crate::model::Recipient;

pub const DEFAULT_URL: &str =
    "https://trouverunlogement.lescrous.fr/tools/41/search?bounds=-1.7525876_48.1549705_-1.6244045_48.0769155";
pub const DEFAULT_AREA: &str = "Rennes";
pub const DEFAULT_INTERVAL_MINUTES: i64 = 5;

const TOKEN_PLACEHOLDER: &str = "YOUR_BOT_TOKEN_HERE";
const CHAT_ID_PLACEHOLDER: &str = "YOUR_CHAT_ID_HERE";

/// `config.json` as written by hand; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub telegram: TelegramSection,
    pub settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    pub chat_ids: Option<Vec<String>>,
    /// Single recipient, older layout.
    pub chat_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SettingsSection {
    pub check_interval_minutes: Option<i64>,
    pub url: Option<String>,
    pub area: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
}

/// What the page side of the watcher needs.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub url: String,
    pub area: String,
    pub interval: Duration,
    pub fetch_timeout: Duration,
}

#[derive(Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_ids: Vec<Recipient>,
}

impl fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &"<redacted>")
            .field("chat_ids", &self.chat_ids)
            .finish()
    }
}

/// Read the optional JSON file, then let environment variables override it.
/// `env` is `std::env::var` in production.
pub fn load(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<FileConfig, ConfigError> {
    let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
    let chat_ids = env("TELEGRAM_CHAT_IDS").map(|v| split_ids(&v));

    let config = Config::builder()
        .add_source(File::from(path).format(FileFormat::Json).required(false))
        .set_override_option("telegram.bot_token", env("TELEGRAM_BOT_TOKEN"))?
        .set_override_option("telegram.chat_ids", chat_ids)?
        .set_override_option("telegram.chat_id", env("TELEGRAM_CHAT_ID"))?
        .set_override_option("settings.check_interval_minutes", env("CHECK_INTERVAL_MINUTES"))?
        .set_override_option("settings.url", env("CROUS_URL"))?
        .set_override_option("settings.area", env("CROUS_AREA"))?
        .build()?;

    Ok(config.try_deserialize()?)
}

impl FileConfig {
    pub fn watch_settings(&self) -> Result<WatchSettings, ConfigError> {
        let minutes = self
            .settings
            .check_interval_minutes
            .unwrap_or(DEFAULT_INTERVAL_MINUTES);
        let interval_secs = u64::try_from(minutes)
            .ok()
            .filter(|m| *m >= 1)
            .and_then(|m| m.checked_mul(60))
            .ok_or(ConfigError::InvalidInterval(minutes))?;

        let fetch_timeout = match self.settings.fetch_timeout_secs {
            Some(0) => return Err(ConfigError::InvalidTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };

        let url = self.settings.url.clone().unwrap_or_else(|| DEFAULT_URL.to_string());
        url::Url::parse(&url).map_err(|source| ConfigError::InvalidUrl {
            url: url.clone(),
            source,
        })?;

        Ok(WatchSettings {
            url,
            area: self
                .settings
                .area
                .clone()
                .unwrap_or_else(|| DEFAULT_AREA.to_string()),
            interval: Duration::from_secs(interval_secs),
            fetch_timeout,
        })
    }

    pub fn bot_token(&self) -> Result<String, ConfigError> {
        match self.telegram.bot_token.as_deref().map(str::trim) {
            None | Some("") => Err(ConfigError::MissingToken),
            Some(TOKEN_PLACEHOLDER) => Err(ConfigError::Placeholder("telegram.bot_token")),
            Some(token) => Ok(token.to_string()),
        }
    }

    /// `chat_ids` wins over the single `chat_id` when both are present.
    pub fn telegram_settings(&self) -> Result<TelegramSettings, ConfigError> {
        let bot_token = self.bot_token()?;

        let chat_ids: Vec<Recipient> = match (&self.telegram.chat_ids, &self.telegram.chat_id) {
            (Some(ids), _) if !ids.is_empty() => ids.clone(),
            (_, Some(id)) => vec![id.clone()],
            _ => Vec::new(),
        };
        let chat_ids: Vec<Recipient> = chat_ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        if chat_ids.is_empty() {
            return Err(ConfigError::NoRecipients);
        }
        if chat_ids.iter().any(|id| id == CHAT_ID_PLACEHOLDER) {
            return Err(ConfigError::Placeholder("telegram.chat_ids"));
        }

        Ok(TelegramSettings { bot_token, chat_ids })
    }
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
