use thiserror::Error;

/// Page could not be read this cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Why a candidate fragment was not turned into a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CandidateRejection {
    #[error("text shorter than {0} characters")]
    TooShort(usize),

    #[error("navigation or boilerplate text")]
    Boilerplate,

    #[error("no price found")]
    NoPrice,

    #[error("duplicate of a listing already seen this cycle")]
    Duplicate,
}

/// One recipient did not get the message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Telegram API error: {description}")]
    Api { description: String },
}

/// Startup configuration is unusable; the watcher never enters its loop.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Telegram bot token is missing (set TELEGRAM_BOT_TOKEN or telegram.bot_token)")]
    MissingToken,

    #[error("no Telegram chat ids configured (set TELEGRAM_CHAT_IDS or telegram.chat_ids)")]
    NoRecipients,

    #[error("placeholder value left in configuration: {0}")]
    Placeholder(&'static str),

    #[error("check interval must be at least 1 minute, got {0}")]
    InvalidInterval(i64),

    #[error("fetch timeout must be at least 1 second")]
    InvalidTimeout,

    #[error("invalid page url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
