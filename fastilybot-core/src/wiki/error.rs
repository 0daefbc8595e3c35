//! Wiki client errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WikiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("API error '{code}': {info}")]
    Api { code: String, info: String },
    #[error("Login failed for '{username}': {reason}")]
    Login { username: String, reason: String },
    #[error("Edit to '{title}' failed: {reason}")]
    Edit { title: String, reason: String },
    #[error("Not logged in, cannot edit '{0}'")]
    Anonymous(String),
    #[error("Unexpected API response: {0}")]
    Malformed(String),
    #[error("Invalid endpoint '{0}'")]
    Endpoint(String),
}
