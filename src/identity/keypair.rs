//! Ed25519 unit keypair.
//!
//! The private key lives in a PKCS#8 PEM file and is generated on first
//! use. The fingerprint is the SHA256 of the public key PEM, hex encoded.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use sha2::{Digest, Sha256};

use crate::error::{GridError, GridResult};
use crate::identity::IdentityProvider;

/// Unit identity backed by an Ed25519 signing key.
pub struct Ed25519Identity {
    device_name: String,
    signing_key: SigningKey,
    fingerprint: String,
    public_key_pem_b64: String,
}

impl std::fmt::Debug for Ed25519Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Identity")
            .field("device_name", &self.device_name)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl Ed25519Identity {
    pub fn from_signing_key(device_name: &str, signing_key: SigningKey) -> GridResult<Self> {
        let public_pem = signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| GridError::Identity(format!("Failed to encode public key: {}", e)))?;

        Ok(Self {
            device_name: device_name.to_string(),
            fingerprint: compute_fingerprint(&public_pem),
            public_key_pem_b64: general_purpose::STANDARD.encode(public_pem.as_bytes()),
            signing_key,
        })
    }

    /// Load the key at `key_path`, generating and saving a new one if absent.
    pub fn load_or_generate(device_name: &str, key_path: &Path) -> GridResult<Self> {
        let signing_key = if key_path.exists() {
            let pem = fs::read_to_string(key_path).map_err(|e| GridError::io(key_path, e))?;
            let key = SigningKey::from_pkcs8_pem(&pem)
                .map_err(|e| GridError::Identity(format!("Invalid private key: {}", e)))?;
            log::info!("IDENTITY_KEY_LOADED path={}", key_path.display());
            key
        } else {
            let key = generate_key()?;
            save_key(&key, key_path)?;
            log::info!("IDENTITY_KEY_GENERATED path={}", key_path.display());
            key
        };

        let identity = Self::from_signing_key(device_name, signing_key)?;
        log::info!(
            "IDENTITY_READY name={} fingerprint={}",
            identity.device_name,
            identity.fingerprint
        );
        Ok(identity)
    }

    /// Check a base64 signature over `message` against this unit's key.
    pub fn verify(&self, message: &str, signature_b64: &str) -> bool {
        let Ok(bytes) = general_purpose::STANDARD.decode(signature_b64) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&bytes) else {
            return false;
        };
        self.signing_key
            .verifying_key()
            .verify(message.as_bytes(), &signature)
            .is_ok()
    }
}

impl IdentityProvider for Ed25519Identity {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn public_key_pem_b64(&self) -> &str {
        &self.public_key_pem_b64
    }

    fn sign(&self, message: &str) -> GridResult<String> {
        let signature = self.signing_key.sign(message.as_bytes());
        Ok(general_purpose::STANDARD.encode(signature.to_bytes()))
    }
}

fn generate_key() -> GridResult<SigningKey> {
    let mut seed = [0u8; 32];
    getrandom::getrandom(&mut seed)
        .map_err(|e| GridError::Identity(format!("No entropy for key generation: {}", e)))?;
    Ok(SigningKey::from_bytes(&seed))
}

fn save_key(key: &SigningKey, key_path: &Path) -> GridResult<()> {
    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| GridError::Identity(format!("Failed to encode private key: {}", e)))?;

    if let Some(parent) = key_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| GridError::io(parent, e))?;
        }
    }
    fs::write(key_path, pem.as_bytes()).map_err(|e| GridError::io(key_path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(key_path, fs::Permissions::from_mode(0o600))
            .map_err(|e| GridError::io(key_path, e))?;
    }

    Ok(())
}

/// SHA256 of the public key PEM, hex encoded.
pub fn compute_fingerprint(public_pem: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_pem.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_identity() -> Ed25519Identity {
        Ed25519Identity::from_signing_key("alpha", SigningKey::from_bytes(&[7u8; 32])).unwrap()
    }

    #[test]
    fn test_identity_string() {
        let id = fixed_identity();
        assert_eq!(id.fingerprint().len(), 64);
        assert_eq!(id.identity(), format!("alpha@{}", id.fingerprint()));
    }

    #[test]
    fn test_public_key_is_base64_pem() {
        let id = fixed_identity();
        let pem = general_purpose::STANDARD
            .decode(id.public_key_pem_b64())
            .unwrap();
        let pem = String::from_utf8(pem).unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert_eq!(compute_fingerprint(&pem), id.fingerprint());
    }

    #[test]
    fn test_sign_and_verify() {
        let id = fixed_identity();
        let message = id.identity();
        let signature = id.sign(&message).unwrap();

        assert!(id.verify(&message, &signature));
        assert!(!id.verify("alpha@someone-else", &signature));
        assert!(!id.verify(&message, "not base64!"));
    }

    #[test]
    fn test_generated_key_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("keys").join("id_ed25519.pem");

        let first = Ed25519Identity::load_or_generate("alpha", &key_path).unwrap();
        assert!(key_path.exists());
        let second = Ed25519Identity::load_or_generate("alpha", &key_path).unwrap();

        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_garbage_key_file_is_identity_error() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("id_ed25519.pem");
        fs::write(&key_path, "not a key").unwrap();

        let err = Ed25519Identity::load_or_generate("alpha", &key_path).unwrap_err();
        assert!(matches!(err, GridError::Identity(_)));
    }
}
