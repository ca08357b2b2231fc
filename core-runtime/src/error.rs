use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Logging could not be configured or was already initialized.
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
