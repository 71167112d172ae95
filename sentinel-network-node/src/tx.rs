//! Deactivation ("set candidate off") transaction requests.
//!
//! Encoding and signing belong to an external wallet library; this module
//! only describes what has to be signed and how to hand it over.

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use zeroize::Zeroizing;

use crate::{Error, Result};

pub const GAS_PRICE: u64 = 1;
pub const GAS_COIN: u64 = 0;

/// Serialized as the numeric chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainId {
    Mainnet,
    Testnet,
}

impl ChainId {
    pub fn from_testnet_flag(testnet: bool) -> Self {
        if testnet {
            ChainId::Testnet
        } else {
            ChainId::Mainnet
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            ChainId::Mainnet => 1,
            ChainId::Testnet => 2,
        }
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureType {
    Single,
    Multi,
}

impl SignatureType {
    /// One seed signs alone; several seeds sign as a multisig wallet.
    pub fn for_seed_count(count: usize) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(SignatureType::Single),
            _ => Some(SignatureType::Multi),
        }
    }
}

/// Everything the signer needs to produce a signed deactivation transaction.
#[derive(Clone, Serialize)]
pub struct CandidateOffRequest {
    pub chain_id: ChainId,
    pub public_key: String,
    /// Control address of the candidate, the multisig wallet for `Multi`.
    pub address: String,
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_coin: u64,
    pub signature_type: SignatureType,
    #[serde(serialize_with = "expose_seeds")]
    seeds: Vec<Zeroizing<String>>,
}

impl CandidateOffRequest {
    pub fn new(
        chain_id: ChainId,
        public_key: &str,
        address: &str,
        nonce: u64,
        seeds: Vec<Zeroizing<String>>,
    ) -> Result<Self> {
        let signature_type = SignatureType::for_seed_count(seeds.len())
            .ok_or_else(|| Error::InvalidRequest("at least one seed is required".to_string()))?;
        Ok(Self {
            chain_id,
            public_key: public_key.to_string(),
            address: address.to_string(),
            nonce,
            gas_price: GAS_PRICE,
            gas_coin: GAS_COIN,
            signature_type,
            seeds,
        })
    }

    pub fn seeds(&self) -> impl Iterator<Item = &str> {
        self.seeds.iter().map(|s| s.as_str())
    }

    pub fn seed_count(&self) -> usize {
        self.seeds.len()
    }
}

impl fmt::Debug for CandidateOffRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateOffRequest")
            .field("chain_id", &self.chain_id)
            .field("public_key", &self.public_key)
            .field("address", &self.address)
            .field("nonce", &self.nonce)
            .field("signature_type", &self.signature_type)
            .field("seeds", &format_args!("[{} redacted]", self.seeds.len()))
            .finish()
    }
}

fn expose_seeds<S: Serializer>(
    seeds: &[Zeroizing<String>],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(seeds.iter().map(|s| s.as_str()))
}

/// Produces an encoded, signed transaction (`0x…`).
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign_candidate_off(&self, request: &CandidateOffRequest) -> Result<String>;
}

/// Delegates signing to an external program.
///
/// The request is written to the program's stdin as JSON; the signed
/// transaction is read from its stdout.
#[derive(Debug, Clone)]
pub struct CommandSigner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

/// How long the signer program may take before it is killed.
pub const SIGNER_TIMEOUT: Duration = Duration::from_secs(30);

impl CommandSigner {
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::InvalidRequest("signer command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: SIGNER_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, input: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Signer(format!("failed to spawn {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .await
                .map_err(|e| Error::Signer(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Signer(e.to_string()))?;

        if !output.status.success() {
            return Err(Error::Signer(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let tx = String::from_utf8(output.stdout)
            .map_err(|e| Error::Signer(e.to_string()))?
            .trim()
            .to_string();
        if tx.is_empty() {
            return Err(Error::Signer(format!("{} produced no transaction", self.program)));
        }
        Ok(tx)
    }
}

#[async_trait]
impl TransactionSigner for CommandSigner {
    async fn sign_candidate_off(&self, request: &CandidateOffRequest) -> Result<String> {
        let input = Zeroizing::new(serde_json::to_vec(request)?);

        let run = self.run(&input);
        // dropping the child on timeout kills it
        match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result,
            Err(_) => Err(Error::Signer(format!(
                "{} timed out after {:?}",
                self.program, self.timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC_KEY: &str = "Mp61022c1428f17e02e5b3b130564ab3d37d41ad32ba361b5704642f079888c821";
    const ADDRESS: &str = "Mx4e16a6bfc1bac5f4cf94ef60ab5047510a32abbc";

    fn seeds(n: usize) -> Vec<Zeroizing<String>> {
        (0..n).map(|i| Zeroizing::new(format!("seed{i}"))).collect()
    }

    #[test]
    fn test_signature_type_follows_seed_count() {
        assert_eq!(SignatureType::for_seed_count(0), None);
        assert_eq!(SignatureType::for_seed_count(1), Some(SignatureType::Single));
        assert_eq!(SignatureType::for_seed_count(2), Some(SignatureType::Multi));
        assert_eq!(SignatureType::for_seed_count(5), Some(SignatureType::Multi));
    }

    #[test]
    fn test_request_requires_seeds() {
        let err = CandidateOffRequest::new(ChainId::Testnet, PUBLIC_KEY, ADDRESS, 1, vec![]);
        assert!(matches!(err, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_request_json_and_debug() {
        let request =
            CandidateOffRequest::new(ChainId::Mainnet, PUBLIC_KEY, ADDRESS, 8, seeds(2)).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["chain_id"], 1);
        assert_eq!(json["signature_type"], "multi");
        assert_eq!(json["nonce"], 8);
        assert_eq!(json["seeds"], serde_json::json!(["seed0", "seed1"]));

        let debug = format!("{request:?}");
        assert!(!debug.contains("seed0"));
        assert!(debug.contains("2 redacted"));
    }

    #[test]
    fn test_command_signer_rejects_empty_command() {
        assert!(CommandSigner::new(&[]).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_signer_reads_stdout() {
        let signer = CommandSigner::new(&[
            "sh".to_string(),
            "-c".to_string(),
            "cat > /dev/null; echo 0xf8a5".to_string(),
        ])
        .unwrap();
        let request =
            CandidateOffRequest::new(ChainId::Testnet, PUBLIC_KEY, ADDRESS, 1, seeds(1)).unwrap();
        assert_eq!(signer.sign_candidate_off(&request).await.unwrap(), "0xf8a5");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_signer_is_killed_after_timeout() {
        let signer = CommandSigner::new(&[
            "sh".to_string(),
            "-c".to_string(),
            "cat > /dev/null; sleep 30; echo 0xf8a5".to_string(),
        ])
        .unwrap()
        .with_timeout(Duration::from_millis(200));
        let request =
            CandidateOffRequest::new(ChainId::Testnet, PUBLIC_KEY, ADDRESS, 1, seeds(1)).unwrap();

        let started = std::time::Instant::now();
        match signer.sign_candidate_off(&request).await {
            Err(Error::Signer(message)) => assert!(message.contains("timed out")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_chain_id_is_numeric() {
        assert_eq!(serde_json::to_value(ChainId::Mainnet).unwrap(), 1);
        assert_eq!(serde_json::to_value(ChainId::Testnet).unwrap(), 2);
        assert_eq!(ChainId::from_testnet_flag(true), ChainId::Testnet);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_signer_reports_failure() {
        let signer = CommandSigner::new(&[
            "sh".to_string(),
            "-c".to_string(),
            "cat > /dev/null; echo bad seed >&2; exit 3".to_string(),
        ])
        .unwrap();
        let request =
            CandidateOffRequest::new(ChainId::Testnet, PUBLIC_KEY, ADDRESS, 1, seeds(1)).unwrap();
        match signer.sign_candidate_off(&request).await {
            Err(Error::Signer(message)) => assert!(message.contains("bad seed")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
