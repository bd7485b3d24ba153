use thiserror::Error;

use crate::Timeframe;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hyperparameter error: {0}")]
    Hyperparameter(String),

    #[error("No candle data for timeframe {0}")]
    UnavailableTimeframe(Timeframe),

    #[error("Indicator error: {0}")]
    Indicator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
