//! External conversational-AI queries.

mod dify;
mod reply;

pub use dify::DifyClient;
pub use reply::ExternalReply;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("remote endpoint returned status {status}: {body}")]
    RemoteError { status: u16, body: String },
    #[error("transport error: {0}")]
    TransportError(String),
    #[error("malformed reply: {0}")]
    MalformedReply(String),
}
