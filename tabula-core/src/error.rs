use thiserror::Error;

/// Every failure surfaced by tabula.
///
/// Variants describe who is at fault: the declaration (`Configuration`,
/// `Schema`), the lookup of a lazily referenced table (`Resolution`), the
/// caller misusing a builder (`Usage`), a value that does not fit the requested
/// type (`Conversion`) or the engine executing the statement (`Engine`).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
