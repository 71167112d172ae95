use serde::{Deserialize, Deserializer, Serialize};

/// Candidate status reported by the node when the masternode is switched on.
pub const CANDIDATE_STATUS_ONLINE: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Status {
    #[serde(rename = "latest_block_height", deserialize_with = "lenient_u64")]
    pub latest_height: u64,
    #[serde(default)]
    pub catching_up: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockValidator {
    pub public_key: String,
    #[serde(default)]
    pub signed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Block {
    #[serde(deserialize_with = "lenient_u64")]
    pub height: u64,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub proposer: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub validators: Vec<BlockValidator>,
}

impl Block {
    /// Whether `public_key` appears among the validators with a signature.
    pub fn is_signed_by(&self, public_key: &str) -> bool {
        self.validators
            .iter()
            .any(|v| v.public_key == public_key && v.signed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    pub public_key: String,
    #[serde(default)]
    pub control_address: String,
    #[serde(default)]
    pub owner_address: String,
    #[serde(default)]
    pub reward_address: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub status: u64,
    #[serde(default, rename = "validator")]
    pub is_validator: bool,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub jailed_until: u64,
}

impl Candidate {
    pub fn is_online(&self) -> bool {
        self.status == CANDIDATE_STATUS_ONLINE
    }

    pub fn is_jailed_at(&self, height: u64) -> bool {
        self.jailed_until > height
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Address {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub transaction_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendTransactionRequest<'a> {
    pub tx: &'a str,
}

/// Result of submitting a transaction. A rejection carries the chain's
/// verdict and is never retried on another endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Accepted { hash: String },
    Rejected { code: u64, message: String },
}

/// Error object embedded by the node in a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub code: u64,
    #[serde(default, alias = "log")]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    /// Codes the API uses to mean success inside an error envelope.
    pub fn is_success_code(&self) -> bool {
        self.code == 0 || self.code == 200
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendTransactionResponse {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

/// The node writes an empty list as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The node encodes most integers as JSON strings; accept both forms.
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) if s.is_empty() => Ok(0),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC_KEY: &str = "Mp61022c1428f17e02e5b3b130564ab3d37d41ad32ba361b5704642f079888c821";

    #[test]
    fn test_block_from_node_json() {
        let block: Block = serde_json::from_value(serde_json::json!({
            "hash": "ABCD",
            "height": "1250",
            "time": "2021-01-01T00:00:00Z",
            "transaction_count": "0",
            "validators": [
                {"public_key": PUBLIC_KEY, "signed": true},
                {"public_key": "Mpother", "signed": false}
            ],
            "missed": []
        }))
        .unwrap();

        assert_eq!(block.height, 1250);
        assert!(block.is_signed_by(PUBLIC_KEY));
        assert!(!block.is_signed_by("Mpother"));
        assert!(!block.is_signed_by("Mpabsent"));
    }

    #[test]
    fn test_block_without_validators() {
        let block: Block = serde_json::from_str(r#"{"height": 7}"#).unwrap();
        assert!(block.validators.is_empty());
        assert!(!block.is_signed_by(PUBLIC_KEY));
    }

    #[test]
    fn test_block_with_null_validators() {
        let block: Block =
            serde_json::from_str(r#"{"height": "5", "validators": null}"#).unwrap();
        assert_eq!(block.height, 5);
        assert!(block.validators.is_empty());
    }

    #[test]
    fn test_candidate_flags() {
        let candidate: Candidate = serde_json::from_value(serde_json::json!({
            "public_key": PUBLIC_KEY,
            "control_address": "Mx4e16a6bfc1bac5f4cf94ef60ab5047510a32abbc",
            "status": 2,
            "validator": true,
            "jailed_until": "120"
        }))
        .unwrap();

        assert!(candidate.is_online());
        assert!(candidate.is_validator);
        assert!(candidate.is_jailed_at(100));
        assert!(!candidate.is_jailed_at(120));
    }

    #[test]
    fn test_error_envelope_accepts_gate_style() {
        let envelope: ErrorEnvelope = serde_json::from_str(
            r#"{"error": {"code": 107, "log": "insufficient funds", "value": 3}}"#,
        )
        .unwrap();
        assert_eq!(envelope.error.code, 107);
        assert_eq!(envelope.error.message, "insufficient funds");

        let envelope: ErrorEnvelope =
            serde_json::from_str(r#"{"error": {"code": "404", "message": "Block not found"}}"#)
                .unwrap();
        assert_eq!(envelope.error.code, 404);
    }
}
