use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::api::NodeApi;
use crate::models::{
    Address, ApiError, Block, Candidate, ErrorEnvelope, SendTransactionRequest,
    SendTransactionResponse, Status, TxOutcome,
};
use crate::{Error, Result};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const STATUS: &str = "/status";
const CANDIDATE: &str = "/candidate";
const BLOCK: &str = "/block";
const ADDRESS: &str = "/address";
const SEND_TRANSACTION: &str = "/send_transaction";

/// One node API base url, e.g. `https://node-api.testnet.minter.network/v2`.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    url: String,
    http: reqwest::Client,
}

/// Decoded body of a node response.
#[derive(Debug)]
pub(crate) enum Answer<T> {
    Data(T),
    Failed { status: u16, error: ApiError },
}

fn not_found(status: u16, error: &ApiError) -> bool {
    status == 404 || error.code == 404
}

impl HttpEndpoint {
    pub fn new(url: &str) -> Result<Self> {
        Self::with_timeouts(url, CONNECT_TIMEOUT, REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(url: &str, connect: Duration, request: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect)
            .timeout(request)
            .build()
            .map_err(|e| Error::transport(url, e))?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Answer<T>> {
        let response = self
            .http
            .get(format!("{}{}", self.url, path))
            .send()
            .await
            .map_err(|e| Error::transport(&self.url, e))?;
        self.read(response).await
    }

    async fn read<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<Answer<T>> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(&self.url, e))?;
        interpret(&self.url, status, &body)
    }
}

/// Maps an HTTP status and body onto data, an application error, or a
/// transport failure. Server-side (5xx) failures count as transport so the
/// caller moves on to the next endpoint.
pub(crate) fn interpret<T: DeserializeOwned>(
    url: &str,
    status: u16,
    body: &[u8],
) -> Result<Answer<T>> {
    if status >= 500 {
        return Err(Error::transport(url, format!("HTTP {status}")));
    }

    if (200..300).contains(&status) {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        if let Some(raw) = value.get("error").filter(|e| e.is_object()) {
            let error: ApiError = serde_json::from_value(raw.clone())?;
            if !error.is_success_code() {
                return Ok(Answer::Failed { status, error });
            }
        }
        return Ok(Answer::Data(serde_json::from_value(value)?));
    }

    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let mut error = envelope.error;
            if error.code == 0 {
                error.code = status as u64;
            }
            Ok(Answer::Failed { status, error })
        }
        Err(_) if status == 404 => Ok(Answer::Failed {
            status,
            error: ApiError {
                code: 404,
                message: "not found".to_string(),
                data: None,
            },
        }),
        Err(e) => Err(Error::Decode(format!("HTTP {status}: {e}"))),
    }
}

fn application(error: ApiError) -> Error {
    Error::Application {
        code: error.code,
        message: error.message,
    }
}

#[async_trait]
impl NodeApi for HttpEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    async fn status(&self) -> Result<Status> {
        match self.get(STATUS).await? {
            Answer::Data(status) => Ok(status),
            Answer::Failed { error, .. } => Err(application(error)),
        }
    }

    async fn block(&self, height: u64) -> Result<Block> {
        match self.get(&format!("{BLOCK}/{height}")).await? {
            Answer::Data(block) => Ok(block),
            Answer::Failed { status, error } if not_found(status, &error) => {
                log::debug!("{}: block {} not created yet: {}", self.url, height, error.message);
                Err(Error::BlockNotFound { height })
            }
            Answer::Failed { error, .. } => Err(application(error)),
        }
    }

    async fn candidate(&self, public_key: &str) -> Result<Candidate> {
        match self.get(&format!("{CANDIDATE}/{public_key}")).await? {
            Answer::Data(candidate) => Ok(candidate),
            Answer::Failed { status, error } if not_found(status, &error) => {
                Err(Error::CandidateNotFound {
                    public_key: public_key.to_string(),
                })
            }
            Answer::Failed { error, .. } => Err(application(error)),
        }
    }

    async fn address(&self, address: &str) -> Result<Address> {
        match self.get(&format!("{ADDRESS}/{address}")).await? {
            Answer::Data(address) => Ok(address),
            Answer::Failed { error, .. } => Err(application(error)),
        }
    }

    async fn send_transaction(&self, tx: &str) -> Result<TxOutcome> {
        let response = self
            .http
            .post(format!("{}{}", self.url, SEND_TRANSACTION))
            .json(&SendTransactionRequest { tx })
            .send()
            .await
            .map_err(|e| Error::transport(&self.url, e))?;

        match self.read::<SendTransactionResponse>(response).await? {
            Answer::Data(SendTransactionResponse {
                error: Some(error), ..
            }) if !error.is_success_code() => Ok(TxOutcome::Rejected {
                code: error.code,
                message: error.message,
            }),
            Answer::Data(SendTransactionResponse {
                hash: Some(hash), ..
            }) => Ok(TxOutcome::Accepted { hash }),
            Answer::Data(_) => Err(Error::Decode(
                "send_transaction response carries neither hash nor error".to_string(),
            )),
            Answer::Failed { error, .. } => Ok(TxOutcome::Rejected {
                code: error.code,
                message: error.message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://node.local/v2";

    #[test]
    fn test_interpret_data() {
        let answer: Answer<Status> = interpret(
            URL,
            200,
            br#"{"latest_block_height": "42", "catching_up": false}"#,
        )
        .unwrap();
        match answer {
            Answer::Data(status) => assert_eq!(status.latest_height, 42),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interpret_block_not_found() {
        let answer: Answer<Block> = interpret(
            URL,
            404,
            br#"{"error": {"code": "404", "message": "Block not found"}}"#,
        )
        .unwrap();
        match answer {
            Answer::Failed { status, error } => {
                assert!(not_found(status, &error));
                assert_eq!(error.message, "Block not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interpret_bare_404() {
        let answer: Answer<Block> = interpret(URL, 404, b"<html>not found</html>").unwrap();
        assert!(matches!(answer, Answer::Failed { status: 404, .. }));
    }

    #[test]
    fn test_interpret_server_error_is_transport() {
        let err = interpret::<Status>(URL, 502, b"bad gateway").unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_interpret_error_inside_success() {
        let answer: Answer<SendTransactionResponse> = interpret(
            URL,
            200,
            br#"{"error": {"code": "114", "message": "Unexpected nonce"}}"#,
        )
        .unwrap();
        match answer {
            Answer::Failed { error, .. } => assert_eq!(error.code, 114),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interpret_garbage_is_decode_error() {
        let err = interpret::<Status>(URL, 200, b"not json").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));

        let err = interpret::<Status>(URL, 400, b"not json").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let endpoint = HttpEndpoint::new("http://node.local/v2/").unwrap();
        assert_eq!(endpoint.url(), "http://node.local/v2");
    }
}
