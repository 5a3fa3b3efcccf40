use gatehouse_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid exemption pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("{message}")]
    Message { message: String },
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

gatehouse_common::impl_context!();
