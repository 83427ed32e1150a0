use thiserror::Error;

/// Rejected watchlist input. Surfaced to whoever called `add`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing ID or Price: id is required")]
    MissingId,

    #[error("Missing ID or Price: maxPrice is required")]
    MissingMaxPrice,

    #[error("maxPrice must be a finite, non-negative number (got {0})")]
    InvalidMaxPrice(String),

    #[error("item {0} is already on the watchlist")]
    DuplicateId(String),
}

/// The watchlist file could not be written. The in-memory state was not changed.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("watchlist io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watchlist encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Item is currently unlisted or the feed answered with a non-OK code.
    #[error("no sell orders")]
    NoData,

    #[error("transient fetch failure: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transient(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("DISCORD_WEBHOOK_URL is not configured")]
    NotConfigured,

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rejected the message: {status} {body}")]
    Status { status: u16, body: String },
}
