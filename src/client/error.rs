//! Errors returned by the API client.

use thiserror::Error;

/// Errors returned by [`super::HashicupsApi`] calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with something other than 200 OK.
    #[error("status: {status}, body: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body as text.
        body: String,
    },

    /// The response body was not the JSON we expected.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The client was given an unusable host.
    #[error("invalid host: {0}")]
    InvalidHost(String),
}
