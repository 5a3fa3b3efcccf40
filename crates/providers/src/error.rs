use gatehouse_bootstrap::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{context} failed with HTTP {status}")]
    Status {
        context: &'static str,
        status: reqwest::StatusCode,
    },
}

impl From<Error> for ServiceError {
    fn from(err: Error) -> Self {
        ServiceError::external("provider request", err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
