/// Errors raised while talking to the match history API.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// HTTP request failed (network, DNS, TLS, timeout, etc.).
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// Server answered with a non-success status.
    #[error("unexpected status {status} for {url}: {body}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        source: reqwest::Error,
    },

    /// Body was not the expected JSON array, or a record lacked a field.
    #[error("invalid match list json from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}
