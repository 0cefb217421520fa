//! Unit identity and signing.
//!
//! Enrollment only needs a name, a key fingerprint, the public key and a
//! `sign(message)` capability; `IdentityProvider` is that contract.

pub mod keypair;

pub use keypair::*;

use crate::error::GridResult;

/// Stable unit identity able to sign messages.
pub trait IdentityProvider {
    fn device_name(&self) -> &str;

    fn fingerprint(&self) -> &str;

    /// Base64 of the public key PEM, as sent on enrollment.
    fn public_key_pem_b64(&self) -> &str;

    /// Sign `message`, returning a base64 signature.
    fn sign(&self, message: &str) -> GridResult<String>;

    /// `<device_name>@<fingerprint>`
    fn identity(&self) -> String {
        format!("{}@{}", self.device_name(), self.fingerprint())
    }
}

/// Hostname of the unit, used when no device name is configured.
pub fn host_device_name() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}
