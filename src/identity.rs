//! Agent identity
//!
//! The narrow view of the agent's key management that the core needs:
//! an author DID, link signing, and deterministic per-scope key derivation
//! for sandboxed plugins. Root key material never leaves the implementation.

use crate::error::{ApiError, StorageError};
use crate::link::{ExpressionProof, LinkExpression};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::info;

const SCOPED_KEY_CONTEXT: &str = "weave 2024-06-01 scoped plugin signing key";

/// Identity collaborator consumed by perspectives and the capability bridge.
pub trait AgentIdentity: Send + Sync {
    /// DID used as the author of locally created links.
    fn did(&self) -> String;

    /// Sign a payload with the agent's root key.
    fn sign(&self, payload: &[u8]) -> Result<ExpressionProof, ApiError>;

    /// Deterministically derive a signer scoped to `scope`.
    fn derive_scoped_signer(&self, scope: &str) -> ScopedSigner;
}

/// Public description of a scoped signing identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningDna {
    pub agent: String,
    pub scope: String,
    /// Hex-encoded ed25519 verifying key
    pub verifying_key: String,
}

/// Signing capability bound to one scope. The secret half stays private.
pub struct ScopedSigner {
    dna: SigningDna,
    key: SigningKey,
}

impl ScopedSigner {
    pub fn dna(&self) -> &SigningDna {
        &self.dna
    }

    /// Hex-encoded signature over `payload`.
    pub fn sign(&self, payload: &[u8]) -> String {
        hex::encode(self.key.sign(payload).to_bytes())
    }
}

impl std::fmt::Debug for ScopedSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedSigner").field("dna", &self.dna).finish()
    }
}

/// Identity backed by a single ed25519 root seed.
pub struct Ed25519Agent {
    seed: [u8; 32],
    key: SigningKey,
}

impl Ed25519Agent {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            seed,
            key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn verifying_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    /// Read a hex seed from `path`, generating and storing one if absent.
    pub fn load_or_create(path: &Path) -> Result<Self, ApiError> {
        if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(StorageError::IoError)?;
            let bytes = hex::decode(raw.trim())
                .map_err(|e| ApiError::Signing(format!("Invalid agent seed in {}: {}", path.display(), e)))?;
            let seed = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
                ApiError::Signing(format!("Agent seed in {} must be 32 bytes", path.display()))
            })?;
            return Ok(Self::from_seed(seed));
        }

        let seed = SigningKey::generate(&mut OsRng).to_bytes();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::IoError)?;
        }
        write_secret(path, hex::encode(seed).as_bytes()).map_err(|e| {
            StorageError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        info!(path = %path.display(), "Generated agent seed");
        Ok(Self::from_seed(seed))
    }
}

/// Create `path` readable by the owner only. Fails if it already exists.
fn write_secret(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

impl AgentIdentity for Ed25519Agent {
    fn did(&self) -> String {
        format!("did:key:{}", self.verifying_key_hex())
    }

    fn sign(&self, payload: &[u8]) -> Result<ExpressionProof, ApiError> {
        Ok(ExpressionProof {
            signature: hex::encode(self.key.sign(payload).to_bytes()),
            key: self.verifying_key_hex(),
            valid: true,
        })
    }

    fn derive_scoped_signer(&self, scope: &str) -> ScopedSigner {
        let mut material = Vec::with_capacity(self.seed.len() + scope.len());
        material.extend_from_slice(&self.seed);
        material.extend_from_slice(scope.as_bytes());
        let key = SigningKey::from_bytes(&blake3::derive_key(SCOPED_KEY_CONTEXT, &material));

        ScopedSigner {
            dna: SigningDna {
                agent: self.did(),
                scope: scope.to_string(),
                verifying_key: hex::encode(key.verifying_key().to_bytes()),
            },
            key,
        }
    }
}

/// Check a link's proof against its signing payload.
///
/// Links without a proof, or with malformed key/signature encodings, do not
/// verify.
pub fn verify_proof(link: &LinkExpression) -> bool {
    let Some(proof) = &link.proof else {
        return false;
    };
    let Ok(key_bytes) = hex::decode(&proof.key) else {
        return false;
    };
    let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(&proof.signature) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&signature_bytes) else {
        return false;
    };
    let Ok(payload) = link.signing_payload() else {
        return false;
    };
    key.verify(&payload, &signature).is_ok()
}
