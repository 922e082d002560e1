//! Error types for exchange requests and user input validation

use thiserror::Error;

/// Maximum number of response body characters kept in error messages
const BODY_SNIPPET_LEN: usize = 200;

/// Failure of a single request against the exchange REST API
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("unexpected response format, expected 'result' list: {0}")]
    MissingResult(String),

    #[error("failed to decode 'result' items: {0}")]
    Decode(#[source] serde_json::Error),
}

impl FetchError {
    /// Build a `Status` error keeping only the start of the body
    pub fn status(status: reqwest::StatusCode, body: &str) -> Self {
        Self::Status {
            status,
            body: snippet(body),
        }
    }

    /// Build a `MissingResult` error keeping only the start of the body
    pub fn missing_result(body: &str) -> Self {
        Self::MissingResult(snippet(body))
    }

    /// True when the server answered but the payload had the wrong shape
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::InvalidJson(_) | Self::MissingResult(_) | Self::Decode(_)
        )
    }
}

fn snippet(body: &str) -> String {
    if body.chars().count() <= BODY_SNIPPET_LEN {
        body.to_string()
    } else {
        let head: String = body.chars().take(BODY_SNIPPET_LEN).collect();
        format!("{}...", head)
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Rejection reasons for interactive or flag-supplied input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("'{0}' is not a valid or currently listed symbol")]
    UnknownSymbol(String),

    #[error("'{0}' is not a valid year")]
    NotAYear(String),

    #[error("years must be between {min} and the current year ({max}), got {year}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("start year ({start}) cannot be after end year ({end})")]
    StartAfterEnd { start: i32, end: i32 },

    #[error("unsupported resolution '{0}'")]
    UnknownResolution(String),

    #[error("input closed before a valid value was entered")]
    EndOfInput,
}
