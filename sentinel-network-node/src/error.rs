use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("node {endpoint} unreachable: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("block {height} not found")]
    BlockNotFound { height: u64 },

    #[error("candidate {public_key} not found")]
    CandidateNotFound { public_key: String },

    #[error("[{code}] {message}")]
    Application { code: u64, message: String },

    #[error("failed to decode node response: {0}")]
    Decode(String),

    #[error("no node endpoints configured")]
    NoEndpoints,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("signer failed: {0}")]
    Signer(String),
}

impl Error {
    /// Only transport failures move a call on to the next endpoint.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    pub(crate) fn transport(endpoint: &str, reason: impl ToString) -> Self {
        Error::Transport {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_is_retryable() {
        assert!(Error::transport("http://a", "timeout").is_transport());
        assert!(!Error::BlockNotFound { height: 1 }.is_transport());
        assert!(!Error::Application { code: 114, message: "nonce".into() }.is_transport());
        assert!(!Error::Decode("eof".into()).is_transport());
    }
}
