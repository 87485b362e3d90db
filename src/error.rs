use thiserror::Error;

/// Errors that can occur while parsing, resolving or tracking ads
#[derive(Error, Debug)]
pub enum AdError {
    #[error("Failed to parse XML: {0}")]
    XmlParseError(#[from] quick_xml::Error),

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Unknown error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AdError>;
