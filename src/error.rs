use thiserror::Error;

/// Failure taxonomy for a detection request.
///
/// `Decode` is a caller fault (bad upload), the other two are service-side.
/// None of them are retried anywhere in this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("record store failure: {0}")]
    Persistence(String),
}

impl Error {
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Error::Decode(err.to_string())
    }

    pub fn inference(err: impl std::fmt::Display) -> Self {
        Error::Inference(err.to_string())
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Error::Persistence(err.to_string())
    }
}
