use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolygonError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Polygon API error: {0}")]
    Api(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
